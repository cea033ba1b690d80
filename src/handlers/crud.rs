//! List/get/delete shared by the master-data resources.
//!
//! Each resource names its entity and a label for messages; create and update stay with the
//! resource because their payloads and checks differ.

use axum::{
    extract::{Path, State},
    Json,
};
use sea_orm::{
    DatabaseConnection, EntityTrait, Iterable, PrimaryKeyToColumn, PrimaryKeyTrait, QueryOrder,
};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::AppState;

pub trait Resource: Send + Sync + 'static {
    type Entity: EntityTrait;

    /// Singular name used in messages, e.g. "Vendor".
    const LABEL: &'static str;
}

pub type ModelOf<R> = <<R as Resource>::Entity as EntityTrait>::Model;

/// All rows ordered by primary key.
pub async fn find_all<E>(db: &DatabaseConnection) -> AppResult<Vec<E::Model>>
where
    E: EntityTrait,
{
    let mut query = E::find();
    for key in E::PrimaryKey::iter() {
        query = query.order_by_asc(key.into_column());
    }
    Ok(query.all(db).await?)
}

pub async fn find_or_404<E>(db: &DatabaseConnection, id: i32, label: &str) -> AppResult<E::Model>
where
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    E::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", label)))
}

pub async fn delete_or_404<E>(db: &DatabaseConnection, id: i32, label: &str) -> AppResult<()>
where
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    let result = E::delete_by_id(id).exec(db).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("{} not found", label)));
    }

    tracing::info!(resource = label, id, "Deleted");
    Ok(())
}

pub async fn list<R>(State(state): State<AppState>) -> AppResult<Json<Vec<ModelOf<R>>>>
where
    R: Resource,
    ModelOf<R>: Serialize,
{
    Ok(Json(find_all::<R::Entity>(&state.db).await?))
}

pub async fn get<R>(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ModelOf<R>>>
where
    R: Resource,
    ModelOf<R>: Serialize,
    <<R::Entity as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    Ok(Json(find_or_404::<R::Entity>(&state.db, id, R::LABEL).await?))
}

pub async fn delete<R>(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<serde_json::Value>>
where
    R: Resource,
    <<R::Entity as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    delete_or_404::<R::Entity>(&state.db, id, R::LABEL).await?;
    Ok(Json(serde_json::json!({ "message": format!("{} deleted", R::LABEL) })))
}
