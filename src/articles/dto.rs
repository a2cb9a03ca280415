use serde::{Deserialize, Serialize};

use super::repo_types::{Article, ArticleDraft};
use crate::users::dto::PublicUser;

/// `POST /update` form: the draft plus the article id.
#[derive(Debug, Deserialize)]
pub struct UpdateArticleForm {
    pub id: String,
    pub category: String,
    pub title: String,
    pub subtitle: String,
    pub content: String,
}

impl UpdateArticleForm {
    pub fn into_parts(self) -> (String, ArticleDraft) {
        (
            self.id,
            ArticleDraft {
                category: self.category,
                title: self.title,
                subtitle: self.subtitle,
                content: self.content,
            },
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    pub can_modify: bool,
}

#[derive(Debug, Serialize)]
pub struct UserArticles {
    pub user: PublicUser,
    pub articles: Vec<Article>,
}
