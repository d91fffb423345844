//! Notice board
//!
//! Staff notices are kept in memory behind a `RwLock` and the whole list is
//! rewritten to a JSON file after every change. The board is seeded with the
//! built-in notices the first time it opens against an empty data directory.

use crate::errors::{AppError, Result};
use crate::metrics::record_notice_write;
use crate::store::JsonFileStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Ids handed out to notices written through the portal start here
pub const FIRST_USER_NOTICE_ID: u64 = 100_000;

/// Default page size of the board listing
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Upper bound for a caller-supplied page size
pub const MAX_PAGE_SIZE: usize = 50;

/// Number of notices shown in the "recent" widget
pub const RECENT_LIMIT: usize = 3;

pub const MAX_ATTACHMENTS: usize = 5;
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Label that selects every category in filters
pub const ALL_CATEGORIES: &str = "전체";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeCategory {
    #[serde(rename = "공지")]
    Announcement,
    #[default]
    #[serde(rename = "안내")]
    Guidance,
    #[serde(rename = "업데이트")]
    Update,
}

impl NoticeCategory {
    pub const ALL: [NoticeCategory; 3] = [
        NoticeCategory::Announcement,
        NoticeCategory::Guidance,
        NoticeCategory::Update,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NoticeCategory::Announcement => "공지",
            NoticeCategory::Guidance => "안내",
            NoticeCategory::Update => "업데이트",
        }
    }
}

impl FromStr for NoticeCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        NoticeCategory::ALL
            .into_iter()
            .find(|c| c.label() == s.trim())
            .ok_or_else(|| AppError::InvalidFormat {
                message: format!("unknown notice category: {}", s),
            })
    }
}

/// Attachment metadata; file bodies are not stored by the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub author: String,
    pub date: NaiveDate,
    pub category: NoticeCategory,
    pub views: u64,
    pub is_important: bool,
    pub is_published: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Editable fields of a notice, as submitted by the writer form
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeDraft {
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(default)]
    pub category: NoticeCategory,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl NoticeDraft {
    /// Check the form rules and return the draft with trimmed text fields
    pub fn validated(mut self) -> Result<Self> {
        self.title = self.title.trim().to_string();
        self.content = self.content.trim().to_string();
        self.author = self.author.trim().to_string();

        if self.title.is_empty() {
            return Err(AppError::validation("title", "제목을 입력해주세요"));
        }
        if self.title.chars().count() < 5 {
            return Err(AppError::validation("title", "제목은 5자 이상 입력해주세요"));
        }
        if self.content.is_empty() {
            return Err(AppError::validation("content", "내용을 입력해주세요"));
        }
        if self.content.chars().count() < 10 {
            return Err(AppError::validation("content", "내용은 10자 이상 입력해주세요"));
        }
        if self.author.is_empty() {
            return Err(AppError::validation("author", "작성자를 입력해주세요"));
        }

        if self.attachments.len() > MAX_ATTACHMENTS {
            return Err(AppError::validation(
                "attachments",
                format!("최대 {}개의 파일만 업로드할 수 있습니다.", MAX_ATTACHMENTS),
            ));
        }
        if let Some(big) = self
            .attachments
            .iter()
            .find(|a| a.size > MAX_ATTACHMENT_BYTES)
        {
            return Err(AppError::PayloadTooLarge {
                size: big.size,
                limit: MAX_ATTACHMENT_BYTES,
            });
        }

        Ok(self)
    }
}

/// Listing filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub include_unpublished: bool,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticePage {
    pub items: Vec<Notice>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

pub struct NoticeBoard {
    notices: RwLock<Vec<Notice>>,
    store: JsonFileStore<Notice>,
}

impl NoticeBoard {
    /// Open the board stored at `path`, seeding it on first use
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = JsonFileStore::new(path);
        let notices = store.load_or_seed(builtin_notices).await?;

        info!(
            path = %store.path().display(),
            notices = notices.len(),
            "Notice board opened"
        );

        Ok(Self {
            notices: RwLock::new(notices),
            store,
        })
    }

    pub async fn is_writable(&self) -> bool {
        self.store.is_writable().await
    }

    pub async fn count(&self) -> usize {
        self.notices.read().await.len()
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &NoticeQuery) -> Result<NoticePage> {
        let category = match query.category.as_deref().map(str::trim) {
            None | Some("") | Some(ALL_CATEGORIES) => None,
            Some(label) => Some(label.parse::<NoticeCategory>()?),
        };
        let needle = query
            .q
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        let notices = self.notices.read().await;
        let matching: Vec<&Notice> = notices
            .iter()
            .filter(|n| query.include_unpublished || n.is_published)
            .filter(|n| category.map_or(true, |c| n.category == c))
            .filter(|n| match &needle {
                Some(q) => {
                    n.title.to_lowercase().contains(q) || n.content.to_lowercase().contains(q)
                }
                None => true,
            })
            .collect();

        let per_page = query
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1).max(1);
        let total = matching.len();
        let total_pages = total.div_ceil(per_page);

        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .cloned()
            .collect();

        Ok(NoticePage {
            items,
            page,
            per_page,
            total,
            total_pages,
        })
    }

    /// Fetch a notice for display; counts as one view
    pub async fn get(&self, id: u64) -> Result<Notice> {
        self.modify(id, "view", |notice| {
            notice.views += 1;
            Ok(())
        })
        .await
    }

    pub async fn create(&self, draft: NoticeDraft) -> Result<Notice> {
        self.create_on(draft, chrono::Local::now().date_naive()).await
    }

    /// Create a notice dated `date`; new notices go to the top of the board
    pub async fn create_on(&self, draft: NoticeDraft, date: NaiveDate) -> Result<Notice> {
        let draft = draft.validated()?;

        let mut notices = self.notices.write().await;
        let id = notices
            .iter()
            .map(|n| n.id + 1)
            .max()
            .unwrap_or(0)
            .max(FIRST_USER_NOTICE_ID);

        let notice = Notice {
            id,
            title: draft.title,
            content: draft.content,
            author: draft.author,
            date,
            category: draft.category,
            views: 0,
            is_important: draft.is_important,
            is_published: draft.is_published.unwrap_or(true),
            attachments: draft.attachments,
        };

        let mut next = notices.clone();
        next.insert(0, notice.clone());
        self.store.write(&next).await?;
        *notices = next;

        record_notice_write("create");
        info!(notice_id = id, category = notice.category.label(), "Notice created");
        Ok(notice)
    }

    pub async fn update(&self, id: u64, draft: NoticeDraft) -> Result<Notice> {
        let draft = draft.validated()?;
        self.modify(id, "update", move |notice| {
            notice.title = draft.title;
            notice.content = draft.content;
            notice.author = draft.author;
            notice.category = draft.category;
            notice.is_important = draft.is_important;
            notice.attachments = draft.attachments;
            if let Some(published) = draft.is_published {
                notice.is_published = published;
            }
            Ok(())
        })
        .await
    }

    pub async fn toggle_publish(&self, id: u64) -> Result<Notice> {
        self.modify(id, "publish", |notice| {
            notice.is_published = !notice.is_published;
            Ok(())
        })
        .await
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        let mut notices = self.notices.write().await;
        let pos = notices
            .iter()
            .position(|n| n.id == id)
            .ok_or(AppError::NoticeNotFound { id })?;

        let mut next = notices.clone();
        next.remove(pos);
        self.store.write(&next).await?;
        *notices = next;

        record_notice_write("delete");
        info!(notice_id = id, "Notice deleted");
        Ok(())
    }

    /// Most recent published notices by date
    pub async fn recent(&self, limit: usize) -> Vec<Notice> {
        let notices = self.notices.read().await;
        let mut published: Vec<Notice> = notices.iter().filter(|n| n.is_published).cloned().collect();
        published.sort_by(|a, b| b.date.cmp(&a.date));
        published.truncate(limit);
        published
    }

    /// Items for the scrolling banner
    ///
    /// Important published notices win over the rest; newest id first. An
    /// empty board falls back to the built-in banner items.
    pub async fn ticker(&self) -> Vec<Notice> {
        let notices = self.notices.read().await;
        let published: Vec<&Notice> = notices.iter().filter(|n| n.is_published).collect();

        let mut items: Vec<Notice> = prefer_important(&published)
            .into_iter()
            .cloned()
            .collect();
        items.sort_by(|a, b| b.id.cmp(&a.id));

        if items.is_empty() {
            let fallback = fallback_ticker(chrono::Local::now().date_naive());
            let refs: Vec<&Notice> = fallback.iter().collect();
            items = prefer_important(&refs).into_iter().cloned().collect();
            debug!(items = items.len(), "Ticker using fallback items");
        }
        items
    }

    async fn modify<F>(&self, id: u64, operation: &str, apply: F) -> Result<Notice>
    where
        F: FnOnce(&mut Notice) -> Result<()>,
    {
        let mut notices = self.notices.write().await;
        let pos = notices
            .iter()
            .position(|n| n.id == id)
            .ok_or(AppError::NoticeNotFound { id })?;

        let mut next = notices.clone();
        apply(&mut next[pos])?;
        self.store.write(&next).await?;
        *notices = next;

        record_notice_write(operation);
        debug!(notice_id = id, operation, "Notice modified");
        Ok(notices[pos].clone())
    }
}

fn prefer_important<'a>(notices: &[&'a Notice]) -> Vec<&'a Notice> {
    let important: Vec<&Notice> = notices.iter().copied().filter(|n| n.is_important).collect();
    if important.is_empty() {
        notices.to_vec()
    } else {
        important
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

#[allow(clippy::too_many_arguments)]
fn notice(
    id: u64,
    title: &str,
    content: &str,
    author: &str,
    date: NaiveDate,
    category: NoticeCategory,
    views: u64,
    is_important: bool,
    is_published: bool,
) -> Notice {
    Notice {
        id,
        title: title.to_string(),
        content: content.to_string(),
        author: author.to_string(),
        date,
        category,
        views,
        is_important,
        is_published,
        attachments: Vec::new(),
    }
}

/// Notices present on a fresh board
pub fn builtin_notices() -> Vec<Notice> {
    use NoticeCategory::*;
    vec![
        notice(
            1,
            "2024년 KCA 자격검정 일정 안내",
            "2024년 KCA 자격검정 시험 일정이 확정되었습니다. 자세한 내용은 첨부파일을 참고하시기 바랍니다.",
            "자격검정팀",
            ymd(2024, 1, 15),
            Announcement,
            245,
            true,
            true,
        ),
        notice(
            2,
            "자격검정 시스템 점검 안내",
            "2024년 1월 20일 오전 2시부터 6시까지 시스템 점검이 예정되어 있습니다. 해당 시간대에는 서비스 이용이 제한될 수 있습니다.",
            "시스템관리팀",
            ymd(2024, 1, 14),
            Guidance,
            189,
            false,
            true,
        ),
        notice(
            3,
            "AI 업무도우미 기능 업데이트",
            "AI 챗봇 기능이 개선되었습니다. 더 정확하고 상세한 답변을 제공할 수 있도록 업데이트되었습니다.",
            "개발팀",
            ymd(2024, 1, 13),
            Update,
            156,
            false,
            true,
        ),
        notice(
            4,
            "응시자격 진단 시스템 개선",
            "응시자격 진단 시스템이 더욱 정확하고 사용하기 쉽게 개선되었습니다. 새로운 기능들을 확인해보세요.",
            "개발팀",
            ymd(2024, 1, 12),
            Update,
            134,
            false,
            false,
        ),
        notice(
            5,
            "담당자 연락처 정보 업데이트",
            "담당자 연락처 정보가 최신으로 업데이트되었습니다. 정확한 연락처로 문의하시기 바랍니다.",
            "인사팀",
            ymd(2024, 1, 11),
            Guidance,
            98,
            false,
            true,
        ),
    ]
}

fn fallback_ticker(today: NaiveDate) -> Vec<Notice> {
    vec![
        notice(
            90001,
            "KCA 자격검정 일정 안내",
            "",
            "자격검정팀",
            today,
            NoticeCategory::Announcement,
            0,
            true,
            true,
        ),
        notice(
            90002,
            "시스템 점검 예정 안내",
            "",
            "시스템관리팀",
            today,
            NoticeCategory::Guidance,
            0,
            false,
            true,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn board() -> (TempDir, NoticeBoard) {
        let dir = tempfile::tempdir().unwrap();
        let board = NoticeBoard::open(dir.path().join("notices.json")).await.unwrap();
        (dir, board)
    }

    fn draft(title: &str) -> NoticeDraft {
        NoticeDraft {
            title: title.to_string(),
            content: "시험장 변경 사항을 반드시 확인해 주시기 바랍니다.".to_string(),
            author: "자격검정팀".to_string(),
            category: NoticeCategory::Announcement,
            is_important: false,
            is_published: None,
            attachments: Vec::new(),
        }
    }

    fn attachment(size: u64) -> Attachment {
        Attachment {
            id: "file-1".into(),
            name: "schedule.pdf".into(),
            size,
            content_type: "application/pdf".into(),
            url: None,
        }
    }

    #[tokio::test]
    async fn test_fresh_board_is_seeded() {
        let (dir, board) = board().await;
        assert_eq!(board.count().await, 5);
        assert!(dir.path().join("notices.json").exists());
    }

    #[tokio::test]
    async fn test_list_hides_unpublished_by_default() {
        let (_dir, board) = board().await;

        let page = board.list(&NoticeQuery::default()).await.unwrap();
        assert_eq!(page.total, 4);
        assert!(page.items.iter().all(|n| n.is_published));

        let all = board
            .list(&NoticeQuery {
                include_unpublished: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.total, 5);
        assert_eq!(all.total_pages, 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_text_and_category() {
        let (_dir, board) = board().await;

        let page = board
            .list(&NoticeQuery {
                q: Some("점검".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, 2);

        let page = board
            .list(&NoticeQuery {
                category: Some("업데이트".into()),
                include_unpublished: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.items.iter().map(|n| n.id).collect::<Vec<_>>(), vec![3, 4]);

        let everything = board
            .list(&NoticeQuery {
                category: Some(ALL_CATEGORIES.into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(everything.total, 4);

        let bad = board
            .list(&NoticeQuery {
                category: Some("긴급".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(bad, Err(AppError::InvalidFormat { .. })));
    }

    #[tokio::test]
    async fn test_pagination() {
        let (_dir, board) = board().await;
        for i in 0..3 {
            board.create(draft(&format!("추가 공지사항 {}", i))).await.unwrap();
        }

        let first = board.list(&NoticeQuery::default()).await.unwrap();
        assert_eq!(first.total, 7);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.items.len(), 5);

        let second = board
            .list(&NoticeQuery {
                page: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);

        let beyond = board
            .list(&NoticeQuery {
                page: Some(9),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
    }

    #[tokio::test]
    async fn test_huge_page_number_is_empty() {
        let (_dir, board) = board().await;
        let page = board
            .list(&NoticeQuery {
                page: Some(usize::MAX),
                per_page: Some(MAX_PAGE_SIZE),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.page, usize::MAX);
        assert_eq!(page.total, 4);
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_goes_first() {
        let (_dir, board) = board().await;
        let date = ymd(2024, 3, 1);

        let first = board.create_on(draft("첫 번째 공지사항"), date).await.unwrap();
        let second = board.create_on(draft("두 번째 공지사항"), date).await.unwrap();

        assert_eq!(first.id, FIRST_USER_NOTICE_ID);
        assert_eq!(second.id, FIRST_USER_NOTICE_ID + 1);
        assert_eq!(second.views, 0);
        assert!(second.is_published);
        assert_eq!(second.date, date);

        let page = board.list(&NoticeQuery::default()).await.unwrap();
        assert_eq!(page.items[0].id, second.id);
        assert_eq!(page.items[1].id, first.id);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (_dir, board) = board().await;

        let short = board.create(draft("짧음")).await;
        assert!(matches!(
            short,
            Err(AppError::Validation { ref field, .. }) if field.as_deref() == Some("title")
        ));

        let mut no_author = draft("작성자 없는 공지");
        no_author.author = "   ".into();
        assert!(board.create(no_author).await.is_err());

        let mut too_many = draft("첨부파일 많은 공지");
        too_many.attachments = (0..6).map(|_| attachment(10)).collect();
        assert!(matches!(
            board.create(too_many).await,
            Err(AppError::Validation { .. })
        ));

        let mut too_big = draft("첨부파일 큰 공지");
        too_big.attachments = vec![attachment(MAX_ATTACHMENT_BYTES + 1)];
        assert!(matches!(
            board.create(too_big).await,
            Err(AppError::PayloadTooLarge { .. })
        ));

        assert_eq!(board.count().await, 5);
    }

    #[tokio::test]
    async fn test_get_counts_views_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notices.json");

        {
            let board = NoticeBoard::open(&path).await.unwrap();
            assert_eq!(board.get(1).await.unwrap().views, 246);
            assert_eq!(board.get(1).await.unwrap().views, 247);
        }

        let reopened = NoticeBoard::open(&path).await.unwrap();
        assert_eq!(reopened.get(1).await.unwrap().views, 248);
        assert!(matches!(
            reopened.get(42).await,
            Err(AppError::NoticeNotFound { id: 42 })
        ));
    }

    #[tokio::test]
    async fn test_update_toggle_delete() {
        let (_dir, board) = board().await;

        let mut edit = draft("수정된 시스템 점검 안내");
        edit.category = NoticeCategory::Guidance;
        let updated = board.update(2, edit).await.unwrap();
        assert_eq!(updated.title, "수정된 시스템 점검 안내");
        assert_eq!(updated.views, 189);

        let hidden = board.toggle_publish(2).await.unwrap();
        assert!(!hidden.is_published);
        let shown = board.toggle_publish(2).await.unwrap();
        assert!(shown.is_published);

        board.delete(2).await.unwrap();
        assert!(matches!(board.delete(2).await, Err(AppError::NoticeNotFound { .. })));
        assert!(matches!(
            board.update(2, draft("없는 공지 수정")).await,
            Err(AppError::NoticeNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_recent_is_published_by_date() {
        let (_dir, board) = board().await;
        let recent = board.recent(RECENT_LIMIT).await;
        assert_eq!(recent.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        board.create_on(draft("새 학기 안내 공지"), ymd(2024, 2, 1)).await.unwrap();
        let recent = board.recent(RECENT_LIMIT).await;
        assert_eq!(recent[0].id, FIRST_USER_NOTICE_ID);
    }

    #[tokio::test]
    async fn test_ticker_prefers_important() {
        let (_dir, board) = board().await;
        let items = board.ticker().await;
        assert_eq!(items.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1]);

        let mut urgent = draft("긴급 시험장 변경 안내");
        urgent.is_important = true;
        let created = board.create(urgent).await.unwrap();
        let items = board.ticker().await;
        assert_eq!(items[0].id, created.id);
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_ticker_falls_back_when_empty() {
        let (_dir, board) = board().await;
        for id in 1..=5 {
            board.delete(id).await.unwrap();
        }

        let items = board.ticker().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 90001);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!("공지".parse::<NoticeCategory>().unwrap(), NoticeCategory::Announcement);
        assert!("전체".parse::<NoticeCategory>().is_err());

        let json = serde_json::to_string(&NoticeCategory::Update).unwrap();
        assert_eq!(json, "\"업데이트\"");
    }

    #[test]
    fn test_notice_wire_format() {
        let json = serde_json::to_value(&builtin_notices()[0]).unwrap();
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["isImportant"], true);
        assert_eq!(json["category"], "공지");
    }
}
