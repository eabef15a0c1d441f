//! Page Context - 当前页面已加载的文章

use tokio::sync::RwLock;

use crate::domain::Article;

/// 页面上下文
///
/// 保存最近一次 loadArticle 提交的文章
#[derive(Default)]
pub struct PageContext {
    article: RwLock<Option<Article>>,
}

impl PageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 替换当前文章
    pub async fn load(&self, article: Article) {
        tracing::info!(
            title = %article.title,
            content_len = article.content.len(),
            "Article loaded"
        );
        *self.article.write().await = Some(article);
    }

    pub async fn article(&self) -> Option<Article> {
        self.article.read().await.clone()
    }
}
