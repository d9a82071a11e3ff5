//! Reference data every deployment needs: status tables, the default
//! currency and the super admin role.

use tracing::info;

use souq_commerce::access::{Role, SUPER_ADMIN_ROLE};
use souq_commerce::catalog::StoreFront;
use souq_commerce::ids::{CurrencyId, RoleId, StatusId, StoreFrontId};
use souq_commerce::money::{Currency, DEFAULT_CURRENCY_CODE};
use souq_commerce::orders::{FulfillmentStatus, OrderStatus, PaymentStatus, StatusKind, StatusRecord};
use souq_commerce::store::{Store, StoreTx};

use crate::error::DbError;

/// What a seeding run inserted. Rows already present are not counted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub statuses: usize,
    pub currencies: usize,
    pub roles: usize,
}

fn order_status_ar(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Draft => "مسودة",
        OrderStatus::PendingPayment => "بانتظار الدفع",
        OrderStatus::Paid => "مدفوع",
        OrderStatus::Confirmed => "مؤكد",
        OrderStatus::Fulfilled => "تم التنفيذ",
        OrderStatus::Completed => "مكتمل",
        OrderStatus::Cancelled => "ملغي",
        OrderStatus::Returned => "مرتجع",
        OrderStatus::Refunded => "مسترد",
    }
}

fn payment_status_names(status: PaymentStatus) -> (&'static str, &'static str) {
    match status {
        PaymentStatus::Unpaid => ("Unpaid", "غير مدفوع"),
        PaymentStatus::Pending => ("Pending", "قيد الانتظار"),
        PaymentStatus::Paid => ("Paid", "مدفوع"),
        PaymentStatus::Refunded => ("Refunded", "مسترد"),
    }
}

fn fulfillment_status_ar(status: FulfillmentStatus) -> &'static str {
    match status {
        FulfillmentStatus::Unfulfilled => "لم يتم التنفيذ",
        FulfillmentStatus::OutForDelivery => "خرج للتوصيل",
        FulfillmentStatus::Fulfilled => "تم التنفيذ",
    }
}

fn status_rows() -> Vec<(StatusKind, StatusRecord)> {
    let row = |slug: &str, en: &str, ar: &str| StatusRecord {
        id: StatusId::default(),
        slug: slug.to_string(),
        name_en: en.to_string(),
        name_ar: ar.to_string(),
    };
    let mut rows = Vec::new();
    for status in OrderStatus::ALL {
        rows.push((
            StatusKind::Order,
            row(status.as_str(), status.display_name(), order_status_ar(status)),
        ));
    }
    for status in PaymentStatus::ALL {
        let (en, ar) = payment_status_names(status);
        rows.push((StatusKind::Payment, row(status.as_str(), en, ar)));
    }
    for status in FulfillmentStatus::ALL {
        rows.push((
            StatusKind::Fulfillment,
            row(status.as_str(), status.display_name(), fulfillment_status_ar(status)),
        ));
    }
    rows
}

/// Insert missing reference rows. Safe to run repeatedly.
pub async fn seed_reference_data(store: &dyn Store) -> Result<SeedReport, DbError> {
    let mut tx = store.begin().await?;
    match seed_in(tx.as_mut()).await {
        Ok(report) => {
            tx.commit().await?;
            info!(
                statuses = report.statuses,
                currencies = report.currencies,
                roles = report.roles,
                engine = store.engine(),
                "reference data seeded"
            );
            Ok(report)
        }
        Err(e) => {
            tx.rollback().await?;
            Err(e)
        }
    }
}

async fn seed_in(tx: &mut dyn StoreTx) -> Result<SeedReport, DbError> {
    let mut report = SeedReport::default();

    for (kind, status) in status_rows() {
        if tx.status(kind, &status.slug).await?.is_none() {
            tx.insert_status(kind, status).await?;
            report.statuses += 1;
        }
    }

    if tx.currency_by_code(DEFAULT_CURRENCY_CODE).await?.is_none() {
        tx.insert_currency(Currency {
            id: CurrencyId::default(),
            code: DEFAULT_CURRENCY_CODE.to_string(),
            symbol: "ر.س".to_string(),
            name_en: "Saudi Riyal".to_string(),
            name_ar: "ريال سعودي".to_string(),
        })
        .await?;
        report.currencies += 1;
    }

    if tx.role_by_name(SUPER_ADMIN_ROLE).await?.is_none() {
        tx.insert_role(Role {
            id: RoleId::default(),
            name: SUPER_ADMIN_ROLE.to_string(),
            description: "Full access to the admin API".to_string(),
        })
        .await?;
        report.roles += 1;
    }

    Ok(report)
}

/// Insert a storefront unless one already serves its domain.
pub async fn ensure_store_front(
    store: &dyn Store,
    name: &str,
    slug: &str,
    domain: &str,
) -> Result<StoreFront, DbError> {
    let mut tx = store.begin().await?;
    if let Some(existing) = tx.store_front_by_domain(domain).await? {
        tx.rollback().await?;
        return Ok(existing);
    }
    let created = tx
        .insert_store_front(StoreFront {
            id: StoreFrontId::default(),
            name: name.to_string(),
            slug: slug.to_string(),
            domain: domain.to_ascii_lowercase(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            default_language: "ar".to_string(),
            is_active: true,
        })
        .await?;
    tx.commit().await?;
    info!(store_front_id = %created.id, domain = %created.domain, "store front created");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_status_rows_cover_every_status() {
        let rows = status_rows();
        let count = |kind| rows.iter().filter(|(k, _)| *k == kind).count();
        assert_eq!(count(StatusKind::Order), OrderStatus::ALL.len());
        assert_eq!(count(StatusKind::Payment), PaymentStatus::ALL.len());
        assert_eq!(count(StatusKind::Fulfillment), FulfillmentStatus::ALL.len());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();
        let first = seed_reference_data(&store).await.unwrap();
        assert_eq!(first.statuses, 16);
        assert_eq!(first.currencies, 1);
        assert_eq!(first.roles, 1);

        let second = seed_reference_data(&store).await.unwrap();
        assert_eq!(second, SeedReport::default());
    }

    #[tokio::test]
    async fn test_ensure_store_front_reuses_domain() {
        let store = MemoryStore::new();
        let a = ensure_store_front(&store, "Main", "main", "Shop.Example.com").await.unwrap();
        let b = ensure_store_front(&store, "Other", "other", "shop.example.com").await.unwrap();
        assert_eq!(a.id, b.id);
    }
}
