/// Template and category models
///
/// Templates are labeled email bodies owned by a sender, optionally filed
/// under a category and tagged with free-form labels.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE categories (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     sender_id UUID NOT NULL REFERENCES senders(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT categories_sender_name_key UNIQUE (sender_id, name)
/// );
///
/// CREATE TABLE templates (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     sender_id UUID NOT NULL REFERENCES senders(id) ON DELETE CASCADE,
///     category_id UUID REFERENCES categories(id) ON DELETE SET NULL,
///     name VARCHAR(255) NOT NULL,
///     subject TEXT NOT NULL DEFAULT '',
///     content TEXT NOT NULL,
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Email template
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub subject: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub sender_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub subject: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Template category
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Normalizes tags: trimmed, lowercase, empty and duplicate entries dropped
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

impl Template {
    /// Builds a template from insert data
    pub fn from_new(data: NewTemplate) -> Self {
        let now = Utc::now();
        Template {
            id: Uuid::new_v4(),
            sender_id: data.sender_id,
            category_id: data.category_id,
            name: data.name,
            subject: data.subject,
            content: data.content,
            tags: data.tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Size of the stored content in bytes
    pub fn content_bytes(&self) -> i64 {
        self.content.len() as i64
    }

    /// Inserts a template
    pub async fn create(pool: &PgPool, data: NewTemplate) -> Result<Self, sqlx::Error> {
        let template = sqlx::query_as::<_, Template>(
            r#"
            INSERT INTO templates (sender_id, category_id, name, subject, content, tags)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sender_id, category_id, name, subject, content, tags, created_at, updated_at
            "#,
        )
        .bind(data.sender_id)
        .bind(data.category_id)
        .bind(data.name)
        .bind(data.subject)
        .bind(data.content)
        .bind(&data.tags)
        .fetch_one(pool)
        .await?;

        Ok(template)
    }

    /// Lists a sender's templates, newest first
    pub async fn list_by_sender(pool: &PgPool, sender_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let templates = sqlx::query_as::<_, Template>(
            r#"
            SELECT id, sender_id, category_id, name, subject, content, tags, created_at, updated_at
            FROM templates
            WHERE sender_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(sender_id)
        .fetch_all(pool)
        .await?;

        Ok(templates)
    }

    /// Deletes a template owned by the sender
    pub async fn delete_by_sender(pool: &PgPool, sender_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1 AND sender_id = $2")
            .bind(id)
            .bind(sender_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl Category {
    /// Inserts a category
    pub async fn create(pool: &PgPool, sender_id: Uuid, name: &str) -> Result<Self, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (sender_id, name)
            VALUES ($1, $2)
            RETURNING id, sender_id, name, created_at
            "#,
        )
        .bind(sender_id)
        .bind(name)
        .fetch_one(pool)
        .await?;

        Ok(category)
    }

    /// Finds a category owned by the sender
    pub async fn find_by_sender(
        pool: &PgPool,
        sender_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, sender_id, name, created_at FROM categories WHERE id = $1 AND sender_id = $2",
        )
        .bind(id)
        .bind(sender_id)
        .fetch_optional(pool)
        .await?;

        Ok(category)
    }

    /// Lists a sender's categories alphabetically
    pub async fn list_by_sender(pool: &PgPool, sender_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, sender_id, name, created_at FROM categories WHERE sender_id = $1 ORDER BY name",
        )
        .bind(sender_id)
        .fetch_all(pool)
        .await?;

        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            " Sales ".to_string(),
            "sales".to_string(),
            "".to_string(),
            "Follow-up".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["sales", "follow-up"]);
    }

    #[test]
    fn test_content_bytes_counts_utf8() {
        let template = Template::from_new(NewTemplate {
            sender_id: Uuid::new_v4(),
            category_id: None,
            name: "Intro".to_string(),
            subject: "Hi".to_string(),
            content: "héllo".to_string(),
            tags: vec![],
        });
        assert_eq!(template.content_bytes(), 6);
    }
}
