//! Staff contact directory
//!
//! Seeded from the bundled contact fixture the first time the portal runs,
//! then persisted as a JSON file next to the notice board.

use crate::errors::{AppError, Result};
use crate::metrics::record_contact_write;
use crate::store::JsonFileStore;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

/// Department label that selects every department
pub const ALL_DEPARTMENTS: &str = "전체";

pub const DEFAULT_WORKING_HOURS: &str = "09:00 ~ 18:00";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: u64,
    pub name: String,
    pub position: String,
    pub department: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub office: String,
    #[serde(default = "default_working_hours")]
    pub working_hours: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

fn default_working_hours() -> String {
    DEFAULT_WORKING_HOURS.to_string()
}

fn phone_pattern() -> Option<&'static regex_lite::Regex> {
    static PHONE: OnceLock<Option<regex_lite::Regex>> = OnceLock::new();
    PHONE
        .get_or_init(|| regex_lite::Regex::new(r"^[0-9-]+$").ok())
        .as_ref()
}

fn validate_phone(phone: &str) -> std::result::Result<(), ValidationError> {
    match phone_pattern() {
        Some(re) if re.is_match(phone) => Ok(()),
        _ => Err(ValidationError::new("phone")
            .with_message(Cow::Borrowed("올바른 전화번호를 입력해주세요"))),
    }
}

/// Contact fields accepted on create and replace
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactDraft {
    #[validate(length(min = 1, message = "이름을 입력해주세요"))]
    pub name: String,

    #[validate(length(min = 1, message = "담당 업무를 입력해주세요"))]
    pub position: String,

    #[validate(length(min = 1, message = "부서를 입력해주세요"))]
    pub department: String,

    #[validate(custom(function = "validate_phone"))]
    pub phone: String,

    #[validate(email(message = "올바른 이메일 주소를 입력해주세요"))]
    pub email: String,

    #[serde(default)]
    pub office: String,

    #[serde(default = "default_working_hours")]
    pub working_hours: String,

    #[serde(default)]
    pub responsibilities: Vec<String>,
}

impl ContactDraft {
    fn normalized(mut self) -> Result<Self> {
        for field in [
            &mut self.name,
            &mut self.position,
            &mut self.department,
            &mut self.phone,
            &mut self.email,
            &mut self.office,
            &mut self.working_hours,
        ] {
            *field = field.trim().to_string();
        }
        self.responsibilities = self
            .responsibilities
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        self.validate()?;
        Ok(self)
    }

    fn into_contact(self, id: u64) -> Contact {
        Contact {
            id,
            name: self.name,
            position: self.position,
            department: self.department,
            phone: self.phone,
            email: self.email,
            office: self.office,
            working_hours: self.working_hours,
            responsibilities: self.responsibilities,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactSortField {
    Name,
    Department,
    Position,
}

impl ContactSortField {
    fn key(self, contact: &Contact) -> &str {
        match self {
            ContactSortField::Name => &contact.name,
            ContactSortField::Department => &contact.department,
            ContactSortField::Position => &contact.position,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactQuery {
    pub q: Option<String>,
    pub department: Option<String>,
    pub sort: Option<ContactSortField>,
    #[serde(default)]
    pub order: SortOrder,
}

pub struct ContactDirectory {
    contacts: RwLock<Vec<Contact>>,
    store: JsonFileStore<Contact>,
}

impl ContactDirectory {
    /// Open the directory at `path`, seeding from `fixture` when it is new
    pub async fn open(path: impl Into<PathBuf>, fixture: &Path) -> Result<Self> {
        let store = JsonFileStore::new(path);
        let contacts = match store.read().await? {
            Some(contacts) => contacts,
            None => {
                let seed = read_fixture(fixture).await?;
                store.write(&seed).await?;
                info!(
                    fixture = %fixture.display(),
                    contacts = seed.len(),
                    "Contact directory seeded"
                );
                seed
            }
        };

        info!(path = %store.path().display(), contacts = contacts.len(), "Contact directory opened");
        Ok(Self {
            contacts: RwLock::new(contacts),
            store,
        })
    }

    pub async fn is_writable(&self) -> bool {
        self.store.is_writable().await
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ContactQuery) -> Vec<Contact> {
        let needle = query
            .q
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        let department = query
            .department
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty() && *d != ALL_DEPARTMENTS);

        let contacts = self.contacts.read().await;
        let mut found: Vec<Contact> = contacts
            .iter()
            .filter(|c| department.map_or(true, |d| c.department == d))
            .filter(|c| match &needle {
                Some(q) => {
                    c.name.to_lowercase().contains(q)
                        || c.position.to_lowercase().contains(q)
                        || c.department.to_lowercase().contains(q)
                }
                None => true,
            })
            .cloned()
            .collect();

        if let Some(field) = query.sort {
            found.sort_by(|a, b| {
                let ord = field.key(a).cmp(field.key(b));
                match query.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }
        found
    }

    /// Distinct departments in first-seen order, led by the "all" label
    pub async fn departments(&self) -> Vec<String> {
        let contacts = self.contacts.read().await;
        let mut departments = vec![ALL_DEPARTMENTS.to_string()];
        for contact in contacts.iter() {
            if !contact.department.is_empty() && !departments.contains(&contact.department) {
                departments.push(contact.department.clone());
            }
        }
        departments
    }

    pub async fn get(&self, id: u64) -> Result<Contact> {
        self.contacts
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(AppError::ContactNotFound { id })
    }

    pub async fn create(&self, draft: ContactDraft) -> Result<Contact> {
        let draft = draft.normalized()?;

        let mut contacts = self.contacts.write().await;
        let id = contacts.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let contact = draft.into_contact(id);

        let mut next = contacts.clone();
        next.push(contact.clone());
        self.store.write(&next).await?;
        *contacts = next;

        record_contact_write("create");
        info!(contact_id = id, department = %contact.department, "Contact created");
        Ok(contact)
    }

    /// Replace every field of an existing contact
    pub async fn update(&self, id: u64, draft: ContactDraft) -> Result<Contact> {
        let draft = draft.normalized()?;

        let mut contacts = self.contacts.write().await;
        let pos = contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or(AppError::ContactNotFound { id })?;

        let contact = draft.into_contact(id);
        let mut next = contacts.clone();
        next[pos] = contact.clone();
        self.store.write(&next).await?;
        *contacts = next;

        record_contact_write("update");
        info!(contact_id = id, "Contact updated");
        Ok(contact)
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        let mut contacts = self.contacts.write().await;
        let pos = contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or(AppError::ContactNotFound { id })?;

        let mut next = contacts.clone();
        next.remove(pos);
        self.store.write(&next).await?;
        *contacts = next;

        record_contact_write("delete");
        info!(contact_id = id, "Contact deleted");
        Ok(())
    }
}

async fn read_fixture(path: &Path) -> Result<Vec<Contact>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Fixture {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
    serde_json::from_str(&raw).map_err(|e| AppError::Fixture {
        message: format!("{}: {}", path.display(), e),
    })
}
