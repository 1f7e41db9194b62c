//! Spreadsheet product import: one worksheet per category.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    routes::params::{parse_decimal, parse_int},
    slug::slugify,
};

/// Rows scanned for a header before a sheet is given up on.
const HEADER_SCAN_ROWS: usize = 10;

/// A worksheet flattened to trimmed cell text.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Name,
    Price,
    Stock,
    Description,
    Supplier,
    Origin,
    Image,
}

/// Header synonyms, German first, in normalized form (see [`normalize_header`]).
const SYNONYMS: [(Column, &[&str]); 8] = [
    (
        Column::Id,
        &["artikelnummer", "artikelnr", "artnr", "nr", "nummer", "id", "sku", "productid", "artikelid"],
    ),
    (
        Column::Name,
        &["bezeichnung", "produktname", "artikelname", "artikel", "produkt", "name", "title", "productname"],
    ),
    (
        Column::Price,
        &["preis", "verkaufspreis", "vkpreis", "preischf", "price", "pricechf"],
    ),
    (
        Column::Stock,
        &["lagerbestand", "bestand", "lager", "menge", "stock", "quantity", "qty"],
    ),
    (
        Column::Description,
        &["beschreibung", "produktbeschreibung", "description", "details"],
    ),
    (
        Column::Supplier,
        &["lieferant", "hersteller", "marke", "supplier", "manufacturer", "brand"],
    ),
    (Column::Origin, &["herkunft", "herkunftsland", "land", "origin", "country"]),
    (
        Column::Image,
        &["bild", "bildurl", "bildlink", "foto", "image", "imageurl", "picture"],
    ),
];

/// One importable row.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedProduct {
    pub id: i64,
    pub name: String,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub description: String,
    pub supplier: String,
    pub origin: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSheet {
    pub category_slug: String,
    pub category_name: String,
    pub products: Vec<ImportedProduct>,
    pub skipped: usize,
}

/// Reads every worksheet of an `.xlsx`, `.xls` or `.ods` workbook.
pub fn read_workbook(bytes: &[u8]) -> AppResult<Vec<Sheet>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|err| AppError::BadRequest(format!("Could not read workbook: {err}")))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|err| AppError::BadRequest(format!("Could not read sheet `{name}`: {err}")))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        sheets.push(Sheet { name, rows });
    }
    Ok(sheets)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

/// Lowercase ASCII letters and digits only: `Artikel-Nr.` becomes `artikelnr`.
fn normalize_header(raw: &str) -> String {
    slugify(raw).replace('-', "")
}

fn column_for(header: &str) -> Option<Column> {
    let key = normalize_header(header);
    if key.is_empty() {
        return None;
    }
    SYNONYMS
        .iter()
        .find(|(_, names)| names.contains(&key.as_str()))
        .map(|(column, _)| *column)
}

/// Position of every recognized column in a candidate header row; the first
/// matching cell wins for each column.
fn header_map(row: &[String]) -> Vec<(Column, usize)> {
    let mut map: Vec<(Column, usize)> = Vec::new();
    for (index, cell) in row.iter().enumerate() {
        if let Some(column) = column_for(cell) {
            if !map.iter().any(|(c, _)| *c == column) {
                map.push((column, index));
            }
        }
    }
    map
}

fn find_header(rows: &[Vec<String>]) -> Option<(usize, Vec<(Column, usize)>)> {
    rows.iter()
        .take(HEADER_SCAN_ROWS)
        .enumerate()
        .map(|(index, row)| (index, header_map(row)))
        .find(|(_, map)| {
            map.iter().any(|(c, _)| *c == Column::Id) && map.iter().any(|(c, _)| *c == Column::Name)
        })
}

/// URL on the legacy image host found anywhere in the row.
fn legacy_image(row: &[String], legacy_host: &str) -> Option<String> {
    if legacy_host.is_empty() {
        return None;
    }
    let host = legacy_host.to_ascii_lowercase();
    row.iter()
        .flat_map(|cell| cell.split_whitespace())
        .find(|token| token.to_ascii_lowercase().contains(&host))
        .map(|token| {
            let token = token.trim_matches(|c| matches!(c, '"' | '\'' | '<' | '>' | '(' | ')'));
            if token.starts_with("http://") || token.starts_with("https://") {
                token.to_string()
            } else {
                format!("https://{}", token.trim_start_matches("//"))
            }
        })
}

pub fn parse_sheet(sheet: &Sheet, legacy_host: &str) -> Option<ParsedSheet> {
    let (header_index, columns) = find_header(&sheet.rows)?;
    let cell = |row: &[String], column: Column| -> String {
        columns
            .iter()
            .find(|(c, _)| *c == column)
            .and_then(|(_, index)| row.get(*index))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };

    let mut products = Vec::new();
    let mut skipped = 0;
    for row in sheet.rows.iter().skip(header_index + 1) {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let id = parse_int(&cell(row, Column::Id)).filter(|id| *id > 0);
        let name = cell(row, Column::Name);
        let Some(id) = id.filter(|_| !name.is_empty()) else {
            skipped += 1;
            continue;
        };

        let image = legacy_image(row, legacy_host)
            .or_else(|| Some(cell(row, Column::Image)).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| id.to_string());

        products.push(ImportedProduct {
            id,
            name,
            price: parse_decimal(&cell(row, Column::Price)).map(|p| p.max(Decimal::ZERO)),
            stock: parse_int(&cell(row, Column::Stock)).map(|s| s.max(0)),
            description: cell(row, Column::Description),
            supplier: cell(row, Column::Supplier),
            origin: cell(row, Column::Origin),
            image,
        });
    }

    Some(ParsedSheet {
        category_slug: slugify(&sheet.name),
        category_name: sheet.name.trim().to_string(),
        products,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str, rows: &[&[&str]]) -> Sheet {
        Sheet {
            name: name.to_string(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn german_headers_are_recognized() {
        assert_eq!(column_for("Artikel-Nr."), Some(Column::Id));
        assert_eq!(column_for("Bezeichnung"), Some(Column::Name));
        assert_eq!(column_for("VK-Preis"), Some(Column::Price));
        assert_eq!(column_for("Lagerbestand"), Some(Column::Stock));
        assert_eq!(column_for("Bild URL"), Some(Column::Image));
        assert_eq!(column_for("Bemerkung"), None);
    }

    #[test]
    fn header_is_found_below_title_rows() {
        let s = sheet(
            "Scharfe Saucen",
            &[
                &["Preisliste 2026", ""],
                &[],
                &["Nr", "Bezeichnung", "Preis", "Bestand"],
                &["101", "Habanero Gold", "CHF 12.90", "7"],
            ],
        );
        let parsed = parse_sheet(&s, "bilder.example.ch").unwrap();
        assert_eq!(parsed.category_slug, "scharfe-saucen");
        assert_eq!(parsed.products.len(), 1);
        let p = &parsed.products[0];
        assert_eq!(p.price, Some(Decimal::new(1290, 2)));
        assert_eq!(p.stock, Some(7));
        assert_eq!(p.image, "101");
    }

    #[test]
    fn rows_without_id_or_name_are_skipped() {
        let s = sheet(
            "Outdoor",
            &[
                &["ID", "Name"],
                &["abc", "No numeric id"],
                &["-4", "Negative"],
                &["7", ""],
                &["8", "Kept"],
            ],
        );
        let parsed = parse_sheet(&s, "").unwrap();
        assert_eq!(parsed.skipped, 3);
        assert_eq!(parsed.products[0].id, 8);
    }

    #[test]
    fn legacy_host_url_wins_over_image_column() {
        let s = sheet(
            "Saucen",
            &[
                &["Nr", "Name", "Bild", "Link"],
                &["5", "Chipotle", "chipotle.png", "siehe bilder.example.ch/p/5.jpg"],
            ],
        );
        let parsed = parse_sheet(&s, "bilder.example.ch").unwrap();
        assert_eq!(parsed.products[0].image, "https://bilder.example.ch/p/5.jpg");
    }

    #[test]
    fn sheet_without_header_is_ignored() {
        let s = sheet("Notizen", &[&["just", "text"]]);
        assert!(parse_sheet(&s, "").is_none());
    }

    #[test]
    fn garbage_bytes_are_a_bad_request() {
        let err = read_workbook(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
