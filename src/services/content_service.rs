//! Blog posts, gallery images and announcements.

use chrono::Utc;

use crate::{
    audit::log_audit,
    dto::{
        content::{
            AnnouncementData, AnnouncementList, BlogPostData, BlogPostList, GalleryImageData,
            GalleryList,
        },
        products::DeletedRecord,
    },
    error::{AppError, AppResult},
    models::{Announcement, BlogPost, GalleryImage},
    response::ApiResponse,
    routes::params::RequestInput,
    services::{RequestContext, require_id, required_text, validate_slots},
    store::{EntityKind, StoreDocument},
    uploads::{self, ImageSlot, ImageSource},
};

const BLOG_IMAGE_SLOTS: [&str; 4] = ["image", "image_2", "image_3", "image_4"];
const ANNOUNCEMENT_IMAGE_SLOTS: [&str; 2] = ["image", "image_2"];

/// Applies the slot instruction for `key` to `current`.
async fn update_slot(
    ctx: &RequestContext<'_>,
    input: &RequestInput,
    key: &str,
    current: &mut Option<String>,
) -> AppResult<()> {
    *current = ctx
        .apply_slot(ImageSlot::from_input(input, key), current.take())
        .await?;
    Ok(())
}

pub fn list_blog_posts(
    doc: &StoreDocument,
    input: &RequestInput,
) -> AppResult<ApiResponse<BlogPostList>> {
    let mut posts: Vec<BlogPost> = match input.i64("id") {
        Some(id) => {
            let post = doc
                .blog_posts
                .iter()
                .find(|p| p.id == id)
                .ok_or_else(|| AppError::NotFound("Blog post not found".into()))?;
            vec![post.clone()]
        }
        None => doc.blog_posts.clone(),
    };
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(ApiResponse::data(BlogPostList {
        total: posts.len(),
        posts,
    }))
}

pub async fn create_blog_post(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<BlogPostData>> {
    let title = required_text(input, "title", "Title")?;
    validate_slots(input, &BLOG_IMAGE_SLOTS)?;

    let mut images: [Option<String>; 4] = Default::default();
    for (slot, key) in images.iter_mut().zip(BLOG_IMAGE_SLOTS) {
        update_slot(ctx, input, key, slot).await?;
    }
    let [image, image_2, image_3, image_4] = images;

    let now = Utc::now();
    let post = BlogPost {
        id: doc.next_id(EntityKind::BlogPost),
        title,
        content: input.text_or_default("content"),
        image,
        image_2,
        image_3,
        image_4,
        created_at: now,
        updated_at: now,
    };
    doc.blog_posts.push(post.clone());

    log_audit(
        ctx.session,
        "blog_post_create",
        "blog_posts",
        Some(serde_json::json!({ "post_id": post.id })),
    );
    Ok(ApiResponse::success("Blog post created", BlogPostData { post }).created())
}

pub async fn update_blog_post(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<BlogPostData>> {
    let id = require_id(input, "id")?;
    validate_slots(input, &BLOG_IMAGE_SLOTS)?;
    let post = doc
        .blog_posts
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound("Blog post not found".into()))?;

    if let Some(title) = input.text("title") {
        post.title = title;
    }
    if let Some(content) = input.raw_text("content") {
        post.content = content;
    }
    update_slot(ctx, input, "image", &mut post.image).await?;
    update_slot(ctx, input, "image_2", &mut post.image_2).await?;
    update_slot(ctx, input, "image_3", &mut post.image_3).await?;
    update_slot(ctx, input, "image_4", &mut post.image_4).await?;
    post.updated_at = Utc::now();
    let post = post.clone();

    log_audit(
        ctx.session,
        "blog_post_update",
        "blog_posts",
        Some(serde_json::json!({ "post_id": id })),
    );
    Ok(ApiResponse::success("Blog post updated", BlogPostData { post }))
}

pub async fn delete_blog_post(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<DeletedRecord>> {
    let id = require_id(input, "id")?;
    let position = doc
        .blog_posts
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound("Blog post not found".into()))?;
    let post = doc.blog_posts.remove(position);
    ctx.discard_images([post.image, post.image_2, post.image_3, post.image_4]);

    log_audit(
        ctx.session,
        "blog_post_delete",
        "blog_posts",
        Some(serde_json::json!({ "post_id": id })),
    );
    Ok(ApiResponse::success("Blog post deleted", DeletedRecord { id }))
}

pub fn list_gallery(doc: &StoreDocument) -> AppResult<ApiResponse<GalleryList>> {
    let mut images = doc.gallery.clone();
    images.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(ApiResponse::data(GalleryList {
        total: images.len(),
        images,
    }))
}

pub async fn create_gallery_image(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<GalleryImageData>> {
    let source = match (input.file("image"), input.text("image_url").or_else(|| input.text("image"))) {
        (Some(file), _) => {
            uploads::validate(file)?;
            ImageSource::Upload(file.clone())
        }
        (None, Some(url)) => ImageSource::Url(url),
        (None, None) => return Err(AppError::BadRequest("An image is required".into())),
    };
    let stored = ctx
        .apply_slot(ImageSlot::Replace(source), None)
        .await?
        .ok_or_else(|| AppError::BadRequest("An image is required".into()))?;

    let image = GalleryImage {
        id: doc.next_id(EntityKind::GalleryImage),
        image_url: stored.clone(),
        image: stored,
        title: input.text_or_default("title"),
        description: input.text_or_default("description"),
        created_at: Utc::now(),
    };
    doc.gallery.push(image.clone());

    log_audit(
        ctx.session,
        "gallery_image_create",
        "gallery",
        Some(serde_json::json!({ "image_id": image.id })),
    );
    Ok(ApiResponse::success("Image added", GalleryImageData { image }).created())
}

pub async fn delete_gallery_image(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<DeletedRecord>> {
    let id = require_id(input, "id")?;
    let position = doc
        .gallery
        .iter()
        .position(|g| g.id == id)
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;
    let image = doc.gallery.remove(position);
    ctx.batch.discard(image.image);

    log_audit(
        ctx.session,
        "gallery_image_delete",
        "gallery",
        Some(serde_json::json!({ "image_id": id })),
    );
    Ok(ApiResponse::success("Image deleted", DeletedRecord { id }))
}

pub fn list_announcements(
    doc: &StoreDocument,
    input: &RequestInput,
) -> AppResult<ApiResponse<AnnouncementList>> {
    let active_only = input.flag("active") || input.flag("active_only");
    let mut announcements: Vec<Announcement> = doc
        .announcements
        .iter()
        .filter(|a| !active_only || a.is_active)
        .cloned()
        .collect();
    announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(ApiResponse::data(AnnouncementList {
        total: announcements.len(),
        announcements,
    }))
}

pub async fn create_announcement(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<AnnouncementData>> {
    let title = required_text(input, "title", "Title")?;
    validate_slots(input, &ANNOUNCEMENT_IMAGE_SLOTS)?;

    let mut images: [Option<String>; 2] = Default::default();
    for (slot, key) in images.iter_mut().zip(ANNOUNCEMENT_IMAGE_SLOTS) {
        update_slot(ctx, input, key, slot).await?;
    }
    let [image, image_2] = images;

    let now = Utc::now();
    let announcement = Announcement {
        id: doc.next_id(EntityKind::Announcement),
        title,
        text: input.text_or_default("text"),
        is_active: input.opt_flag("is_active").unwrap_or(true),
        image,
        image_2,
        created_at: now,
        updated_at: now,
    };
    doc.announcements.push(announcement.clone());

    log_audit(
        ctx.session,
        "announcement_create",
        "announcements",
        Some(serde_json::json!({ "announcement_id": announcement.id })),
    );
    Ok(ApiResponse::success("Announcement created", AnnouncementData { announcement }).created())
}

pub async fn update_announcement(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<AnnouncementData>> {
    let id = require_id(input, "id")?;
    validate_slots(input, &ANNOUNCEMENT_IMAGE_SLOTS)?;
    let announcement = doc
        .announcements
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or_else(|| AppError::NotFound("Announcement not found".into()))?;

    if let Some(title) = input.text("title") {
        announcement.title = title;
    }
    if let Some(text) = input.raw_text("text") {
        announcement.text = text;
    }
    if let Some(active) = input.opt_flag("is_active") {
        announcement.is_active = active;
    }
    update_slot(ctx, input, "image", &mut announcement.image).await?;
    update_slot(ctx, input, "image_2", &mut announcement.image_2).await?;
    announcement.updated_at = Utc::now();
    let announcement = announcement.clone();

    log_audit(
        ctx.session,
        "announcement_update",
        "announcements",
        Some(serde_json::json!({ "announcement_id": id })),
    );
    Ok(ApiResponse::success("Announcement updated", AnnouncementData { announcement }))
}

pub async fn delete_announcement(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<DeletedRecord>> {
    let id = require_id(input, "id")?;
    let position = doc
        .announcements
        .iter()
        .position(|a| a.id == id)
        .ok_or_else(|| AppError::NotFound("Announcement not found".into()))?;
    let announcement = doc.announcements.remove(position);
    ctx.discard_images([announcement.image, announcement.image_2]);

    log_audit(
        ctx.session,
        "announcement_delete",
        "announcements",
        Some(serde_json::json!({ "announcement_id": id })),
    );
    Ok(ApiResponse::success("Announcement deleted", DeletedRecord { id }))
}
