use chrono::{Datelike, Local, NaiveDate};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use crate::utils::text::non_blank;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub full_name: String,
    pub birth_date: Date,
    pub phone: String,
    pub email: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    // UTC, set on insert
    pub created_at: Option<DateTime>,
    pub owner_id: i32,
}

impl Model {
    /// Age in full years as of today (local time).
    pub fn age(&self) -> i32 {
        age_on(self.birth_date, Local::now().date_naive())
    }

    /// Owners and admins may change a document.
    pub fn editable_by(&self, user_id: i32, role: super::Role) -> bool {
        self.owner_id == user_id || role == super::Role::Admin
    }
}

/// Submitted document fields, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentForm {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Validated document values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInput {
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl From<&Model> for DocumentForm {
    fn from(doc: &Model) -> Self {
        Self {
            full_name: Some(doc.full_name.clone()),
            birth_date: Some(doc.birth_date.format(DATE_FORMAT).to_string()),
            phone: Some(doc.phone.clone()),
            email: doc.email.clone(),
            address: doc.address.clone(),
            notes: doc.notes.clone(),
        }
    }
}

impl DocumentForm {
    pub fn validate(&self) -> Result<DocumentInput, String> {
        let full_name = non_blank(self.full_name.as_deref()).ok_or("Укажите ФИО")?;
        let phone = non_blank(self.phone.as_deref()).ok_or("Укажите телефон")?;
        let raw_date = non_blank(self.birth_date.as_deref()).ok_or("Укажите дату рождения")?;
        let birth_date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT)
            .map_err(|_| format!("Неверный формат даты: {} (ожидается ГГГГ-ММ-ДД)", raw_date))?;
        Ok(DocumentInput {
            full_name,
            birth_date,
            phone,
            email: non_blank(self.email.as_deref()),
            address: non_blank(self.address.as_deref()),
            notes: non_blank(self.notes.as_deref()),
        })
    }
}

impl DocumentInput {
    /// Copy the values onto `active`, leaving id, owner and timestamps alone.
    pub fn apply(self, active: &mut ActiveModel) {
        active.full_name = Set(self.full_name);
        active.birth_date = Set(self.birth_date);
        active.phone = Set(self.phone);
        active.email = Set(self.email);
        active.address = Set(self.address);
        active.notes = Set(self.notes);
    }
}

/// Full years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
