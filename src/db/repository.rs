//! Generic persistence helpers shared by the per-entity query modules.
//!
//! Entities opt into soft deletion through [`SoftDelete`]. When an entity
//! names an active-flag column, every read below only sees rows where that
//! flag is `true`, and [`delete_where`] clears the flag instead of removing
//! the row.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr,
    EntityTrait, IntoActiveModel, Order, PaginatorTrait, PrimaryKeyTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};

pub trait SoftDelete: EntityTrait {
    /// Boolean column marking a row as live. `None` means rows are only
    /// ever hard-deleted.
    fn active_column() -> Option<Self::Column> {
        None
    }
}

fn live<E: SoftDelete>(query: Select<E>) -> Select<E> {
    match E::active_column() {
        Some(column) => query.filter(column.eq(true)),
        None => query,
    }
}

pub fn scoped<E: SoftDelete>(condition: Condition) -> Select<E> {
    live(E::find().filter(condition))
}

pub async fn create<A, C>(db: &C, model: A) -> Result<<A::Entity as EntityTrait>::Model, DbErr>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    model.insert(db).await
}

pub async fn update<A, C>(db: &C, model: A) -> Result<<A::Entity as EntityTrait>::Model, DbErr>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    model.update(db).await
}

pub async fn find_by_id<E, C, K>(db: &C, id: K) -> Result<Option<E::Model>, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
    K: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    live(E::find_by_id(id)).one(db).await
}

pub async fn find_first<E, C>(db: &C, condition: Condition) -> Result<Option<E::Model>, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    scoped::<E>(condition).one(db).await
}

pub async fn find_all<E, C>(
    db: &C,
    condition: Condition,
    order: (E::Column, Order),
) -> Result<Vec<E::Model>, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    scoped::<E>(condition)
        .order_by(order.0, order.1)
        .all(db)
        .await
}

pub async fn count<E, C>(db: &C, condition: Condition) -> Result<u64, DbErr>
where
    E: SoftDelete,
    E::Model: Sync,
    C: ConnectionTrait,
{
    scoped::<E>(condition).count(db).await
}

pub async fn exists<E, C>(db: &C, condition: Condition) -> Result<bool, DbErr>
where
    E: SoftDelete,
    E::Model: Sync,
    C: ConnectionTrait,
{
    Ok(count::<E, C>(db, condition).await? > 0)
}

pub async fn find_page<E, C>(
    db: &C,
    condition: Condition,
    order: (E::Column, Order),
    offset: u64,
    limit: u64,
) -> Result<Vec<E::Model>, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    scoped::<E>(condition)
        .order_by(order.0, order.1)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await
}

/// Removes matching rows, or clears their active flag when the entity
/// supports soft deletion. Returns the number of rows affected, so callers
/// can tell "nothing matched" apart from a storage failure.
pub async fn delete_where<E, C>(db: &C, condition: Condition) -> Result<u64, DbErr>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    let result = match E::active_column() {
        Some(column) => {
            E::update_many()
                .col_expr(column, Expr::value(false))
                .filter(condition)
                .filter(column.eq(true))
                .exec(db)
                .await?
                .rows_affected
        }
        None => E::delete_many().filter(condition).exec(db).await?.rows_affected,
    };
    Ok(result)
}
