use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promo_core::repository::{
    OfferFilter, OfferQuery, OfferRepository, OfferStats, StoreError, WindowFilter,
};
use promo_offer::{Offer, OfferFields, ProductDetails, PromoCode};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const COLUMNS: &str = "id, title, description, discount, discount_type, discount_value, \
    valid_from, valid_until, category, promo_code, image, is_active, redemption_steps, \
    product_details, max_redemptions, current_redemptions, target_products, created_at, updated_at";

pub struct PostgresOfferRepository {
    pub pool: PgPool,
}

impl PostgresOfferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OfferRow {
    id: Uuid,
    title: String,
    description: String,
    discount: String,
    discount_type: String,
    discount_value: f64,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    category: String,
    promo_code: String,
    image: Option<String>,
    is_active: bool,
    redemption_steps: Vec<String>,
    product_details: Json<ProductDetails>,
    max_redemptions: Option<i32>,
    current_redemptions: i32,
    target_products: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OfferRow> for Offer {
    type Error = StoreError;

    fn try_from(row: OfferRow) -> Result<Self, Self::Error> {
        Ok(Offer {
            id: row.id,
            title: row.title,
            description: row.description,
            discount: row.discount,
            discount_type: row.discount_type.parse().map_err(StoreError::Backend)?,
            discount_value: row.discount_value,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            category: row.category,
            promo_code: row.promo_code,
            image: row.image,
            is_active: row.is_active,
            redemption_steps: row.redemption_steps,
            product_details: row.product_details.0,
            max_redemptions: row.max_redemptions,
            current_redemptions: row.current_redemptions,
            target_products: row.target_products,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_offer(row: Option<OfferRow>) -> Result<Option<Offer>, StoreError> {
    row.map(Offer::try_from).transpose()
}

/// Unique-index violations become `DuplicateKey` for the code being written.
fn store_error(err: sqlx::Error, promo_code: Option<&str>) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateKey(promo_code.unwrap_or_default().to_string());
        }
    }
    tracing::error!("offer store query failed: {:?}", err);
    StoreError::Backend(err.to_string())
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OfferFilter) {
    qb.push(" WHERE TRUE");
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    match filter.window {
        Some(WindowFilter::Current) => {
            qb.push(" AND valid_from <= ").push_bind(filter.now);
            qb.push(" AND valid_until >= ").push_bind(filter.now);
        }
        Some(WindowFilter::Expired) => {
            qb.push(" AND valid_until < ").push_bind(filter.now);
        }
        Some(WindowFilter::Upcoming) => {
            qb.push(" AND valid_from > ").push_bind(filter.now);
        }
        None => {}
    }
}

#[async_trait]
impl OfferRepository for PostgresOfferRepository {
    async fn insert(&self, offer: &Offer) -> Result<Offer, StoreError> {
        let sql = format!(
            "INSERT INTO special_offers ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, \
                     $11, $12, $13, $14, $15, $16, $17, $18, $19) \
             RETURNING {COLUMNS}"
        );

        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(offer.id)
            .bind(&offer.title)
            .bind(&offer.description)
            .bind(&offer.discount)
            .bind(offer.discount_type.to_string())
            .bind(offer.discount_value)
            .bind(offer.valid_from)
            .bind(offer.valid_until)
            .bind(&offer.category)
            .bind(&offer.promo_code)
            .bind(offer.image.as_deref())
            .bind(offer.is_active)
            .bind(&offer.redemption_steps)
            .bind(Json(&offer.product_details))
            .bind(offer.max_redemptions)
            .bind(offer.current_redemptions)
            .bind(&offer.target_products)
            .bind(offer.created_at)
            .bind(offer.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error(e, Some(&offer.promo_code)))?;

        Offer::try_from(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Offer>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM special_offers WHERE id = $1");
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, None))?;

        into_offer(row)
    }

    async fn find_by_code(&self, code: &PromoCode) -> Result<Option<Offer>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM special_offers WHERE promo_code = $1");
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, None))?;

        into_offer(row)
    }

    async fn list(&self, query: &OfferQuery) -> Result<Vec<Offer>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM special_offers"));
        push_filter(&mut qb, &query.filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.skip);

        let rows = qb
            .build_query_as::<OfferRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error(e, None))?;

        rows.into_iter().map(Offer::try_from).collect()
    }

    async fn count(&self, filter: &OfferFilter) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM special_offers");
        push_filter(&mut qb, filter);

        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error(e, None))
    }

    async fn update(
        &self,
        id: Uuid,
        fields: &OfferFields,
        now: DateTime<Utc>,
    ) -> Result<Option<Offer>, StoreError> {
        // current_redemptions is left alone so concurrent redemptions are never lost.
        let sql = format!(
            "UPDATE special_offers SET \
                title = $2, description = $3, discount = $4, discount_type = $5, \
                discount_value = $6, valid_from = $7, valid_until = $8, category = $9, \
                promo_code = $10, image = $11, is_active = $12, redemption_steps = $13, \
                product_details = $14, max_redemptions = $15, target_products = $16, \
                updated_at = $17 \
             WHERE id = $1 AND ($15::INTEGER IS NULL OR current_redemptions <= $15::INTEGER) \
             RETURNING {COLUMNS}"
        );

        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(id)
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(&fields.discount)
            .bind(fields.discount_type.to_string())
            .bind(fields.discount_value)
            .bind(fields.valid_from)
            .bind(fields.valid_until)
            .bind(&fields.category)
            .bind(fields.promo_code.as_str())
            .bind(fields.image.as_deref())
            .bind(fields.is_active)
            .bind(&fields.redemption_steps)
            .bind(Json(&fields.product_details))
            .bind(fields.max_redemptions)
            .bind(&fields.target_products)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, Some(fields.promo_code.as_str())))?;

        into_offer(row)
    }

    async fn set_active(
        &self,
        id: Uuid,
        is_active: Option<bool>,
    ) -> Result<Option<Offer>, StoreError> {
        let sql = format!(
            "UPDATE special_offers \
             SET is_active = COALESCE($2::BOOLEAN, NOT is_active), updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(id)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, None))?;

        into_offer(row)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Offer>, StoreError> {
        let sql = format!("DELETE FROM special_offers WHERE id = $1 RETURNING {COLUMNS}");
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, None))?;

        into_offer(row)
    }

    async fn redeem(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        product_id: Option<Uuid>,
    ) -> Result<Option<Offer>, StoreError> {
        // Guard and increment in one statement: the row lock taken by UPDATE
        // makes concurrent redemptions re-evaluate the cap against the new value.
        let sql = format!(
            "UPDATE special_offers \
             SET current_redemptions = current_redemptions + 1, updated_at = NOW() \
             WHERE id = $1 \
               AND is_active \
               AND valid_from <= $2 AND valid_until >= $2 \
               AND (max_redemptions IS NULL OR current_redemptions < max_redemptions) \
               AND ($3::UUID IS NULL \
                    OR cardinality(target_products) = 0 \
                    OR $3::UUID = ANY(target_products)) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(id)
            .bind(now)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error(e, None))?;

        into_offer(row)
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<OfferStats, StoreError> {
        let (total, active, expired, valid, redemptions) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE is_active),
                    COUNT(*) FILTER (WHERE valid_until < $1),
                    COUNT(*) FILTER (WHERE is_active AND valid_from <= $1 AND valid_until >= $1),
                    COALESCE(SUM(current_redemptions), 0)::BIGINT
                FROM special_offers
                "#,
            )
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error(e, None))?;

        Ok(OfferStats {
            total,
            active,
            expired,
            valid,
            redemptions,
        })
    }
}
