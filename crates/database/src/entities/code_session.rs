//! Collaborative code session entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CodeSession {
    pub id: i64,
    pub public_id: String,
    pub owner_id: i64,
    pub owner_public_id: String,
    pub title: String,
    pub language: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCodeSession {
    pub owner_id: i64,
    pub title: String,
    pub language: String,
    pub content: String,
}
