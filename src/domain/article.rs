//! Article - 已提取的文章正文
//!
//! 正文提取（Readability 风格）由页面侧完成，这里只保存结果

use serde::{Deserialize, Serialize};

/// 文章元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// 已提取的文章
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: ArticleMetadata,
}

impl Article {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            metadata: ArticleMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ArticleMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// 正文是否为空白
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}
