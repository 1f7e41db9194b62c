use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Announcement, BlogPost, GalleryImage};

#[derive(Debug, Serialize, ToSchema)]
pub struct BlogPostList {
    pub posts: Vec<BlogPost>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BlogPostData {
    pub post: BlogPost,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GalleryList {
    pub images: Vec<GalleryImage>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GalleryImageData {
    pub image: GalleryImage,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnnouncementList {
    pub announcements: Vec<Announcement>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnnouncementData {
    pub announcement: Announcement,
}
