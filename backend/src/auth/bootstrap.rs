//! First-run account setup.

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use super::password::hash_password;
use crate::config::AuthSettings;
use crate::error::CrmResult;
use crate::models::{user, Role};

pub const ADMIN_USERNAME: &str = "admin";

/// Create the `admin` account when it does not exist yet.
/// Returns whether an account was created.
pub async fn ensure_admin<C: ConnectionTrait>(db: &C, settings: &AuthSettings) -> CrmResult<bool> {
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(ADMIN_USERNAME))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }

    let admin = user::ActiveModel {
        username: Set(ADMIN_USERNAME.to_string()),
        password: Set(hash_password(&settings.admin_password, settings.bcrypt_cost).await?),
        role: Set(Role::Admin),
        ..Default::default()
    };
    admin.insert(db).await?;
    log::info!("Created bootstrap account '{}'", ADMIN_USERNAME);
    Ok(true)
}
