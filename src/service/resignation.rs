use chrono::NaiveDate;
use tracing::info;

use crate::{
    auth::auth::Principal,
    error::{AppError, AppResult},
    model::resignation::{Resignation, ResignationStatus, ReviewDecision},
    service::roster::{Page, Pagination},
    store::Store,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResignationFilter {
    pub employee_id: Option<u64>,
    pub status: Option<ResignationStatus>,
}

/// Self-service application by the calling employee; starts `pending`.
pub async fn apply(
    store: &dyn Store,
    principal: &Principal,
    resign_date: Option<NaiveDate>,
    today: NaiveDate,
) -> AppResult<Resignation> {
    let employee_id = principal.own_employee_id()?;
    let resign_date = resign_date.unwrap_or(today);
    if resign_date < today {
        return Err(AppError::validation("resign_date cannot be in the past"));
    }

    let resignation = store
        .create_resignation_application(employee_id, resign_date)
        .await?;
    info!(resignation_id = resignation.id, employee_id, "Resignation application filed");
    Ok(resignation)
}

/// Admins see every application, employees only their own.
pub async fn list(
    store: &dyn Store,
    principal: &Principal,
    status: Option<ResignationStatus>,
    page: Option<u64>,
) -> AppResult<Page<Resignation>> {
    let employee_id = if principal.role.is_admin() {
        None
    } else {
        Some(principal.own_employee_id()?)
    };

    let filter = ResignationFilter { employee_id, status };
    let pagination = Pagination::new(page);
    let (data, total) = store
        .list_resignations(&filter, pagination.offset(), pagination.page_size)
        .await?;

    Ok(Page::new(data, pagination, total))
}

pub async fn get(store: &dyn Store, principal: &Principal, id: u64) -> AppResult<Resignation> {
    let resignation = store
        .find_resignation(id)
        .await?
        .ok_or(AppError::NotFound("Resignation"))?;
    principal.require_self_or_admin(resignation.employee_id)?;
    Ok(resignation)
}

pub async fn review(
    store: &dyn Store,
    principal: &Principal,
    id: u64,
    decision: ReviewDecision,
) -> AppResult<Resignation> {
    principal.require_admin()?;

    let resignation = store.review_resignation(id, decision).await?;
    info!(
        resignation_id = id,
        employee_id = resignation.employee_id,
        status = %resignation.status,
        reviewer = %principal.username,
        "Resignation reviewed"
    );
    Ok(resignation)
}

/// Admin-initiated resignation: recorded as already approved.
pub async fn resign_directly(
    store: &dyn Store,
    principal: &Principal,
    employee_id: u64,
    today: NaiveDate,
) -> AppResult<Resignation> {
    principal.require_admin()?;

    let resignation = store.resign_employee(employee_id, today).await?;
    info!(
        resignation_id = resignation.id,
        employee_id,
        name = %resignation.name,
        "Employee resigned by admin"
    );
    Ok(resignation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::auth::tests::{admin, employee},
        store::memory::{FailPoint, MemoryStore},
    };

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (MemoryStore, u64) {
        let store = MemoryStore::new();
        let dept = store.seed_department("技术科");
        let id = store.seed_employee("张伟", "工程师", dept, true);
        (store, id)
    }

    #[actix_web::test]
    async fn application_snapshots_the_employee() {
        let (store, id) = setup();
        let today = day(2024, 5, 1);

        let r = apply(&store, &employee(id), Some(day(2024, 6, 30)), today).await.unwrap();
        assert_eq!(r.status, ResignationStatus::Pending);
        assert_eq!(r.name, "张伟");
        assert_eq!(r.department, "技术科");
        assert_eq!(r.position, "工程师");
        assert_eq!(r.resign_date, day(2024, 6, 30));
        assert!(store.employee(id).is_active);
    }

    #[actix_web::test]
    async fn approval_deactivates_employee() {
        let (store, id) = setup();
        let r = apply(&store, &employee(id), None, day(2024, 5, 1)).await.unwrap();

        let approved = review(&store, &admin(), r.id, ReviewDecision::Approve).await.unwrap();
        assert_eq!(approved.status, ResignationStatus::Approved);
        assert!(!store.employee(id).is_active);
    }

    #[actix_web::test]
    async fn failed_approval_changes_nothing() {
        let (store, id) = setup();
        let r = apply(&store, &employee(id), None, day(2024, 5, 1)).await.unwrap();

        store.fail_at(FailPoint::AfterDeactivation);
        let result = review(&store, &admin(), r.id, ReviewDecision::Approve).await;
        assert!(matches!(result, Err(AppError::Persistence(_))));

        assert!(store.employee(id).is_active);
        assert_eq!(store.resignation(r.id).status, ResignationStatus::Pending);
    }

    #[actix_web::test]
    async fn rejection_keeps_employee_active() {
        let (store, id) = setup();
        let r = apply(&store, &employee(id), None, day(2024, 5, 1)).await.unwrap();

        let rejected = review(&store, &admin(), r.id, ReviewDecision::Reject).await.unwrap();
        assert_eq!(rejected.status, ResignationStatus::Rejected);
        assert!(store.employee(id).is_active);
    }

    #[actix_web::test]
    async fn terminal_applications_cannot_be_reviewed_again() {
        let (store, id) = setup();
        let r = apply(&store, &employee(id), None, day(2024, 5, 1)).await.unwrap();
        review(&store, &admin(), r.id, ReviewDecision::Reject).await.unwrap();

        let again = review(&store, &admin(), r.id, ReviewDecision::Approve).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert!(store.employee(id).is_active);

        let missing = review(&store, &admin(), 999, ReviewDecision::Approve).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn employees_cannot_review() {
        let (store, id) = setup();
        let r = apply(&store, &employee(id), None, day(2024, 5, 1)).await.unwrap();

        let result = review(&store, &employee(id), r.id, ReviewDecision::Approve).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(store.resignation(r.id).status, ResignationStatus::Pending);
    }

    #[actix_web::test]
    async fn one_pending_application_at_a_time() {
        let (store, id) = setup();
        let today = day(2024, 5, 1);
        apply(&store, &employee(id), None, today).await.unwrap();

        let second = apply(&store, &employee(id), None, today).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));

        let past = apply(&store, &employee(id), Some(day(2024, 4, 1)), today).await;
        assert!(matches!(past, Err(AppError::Validation(_))));
    }

    #[actix_web::test]
    async fn direct_resignation_is_approved_and_atomic() {
        let (store, id) = setup();
        let today = day(2024, 5, 1);

        store.fail_at(FailPoint::AfterDeactivation);
        assert!(resign_directly(&store, &admin(), id, today).await.is_err());
        assert!(store.employee(id).is_active);

        let r = resign_directly(&store, &admin(), id, today).await.unwrap();
        assert_eq!(r.status, ResignationStatus::Approved);
        assert_eq!(r.resign_date, today);
        assert!(!store.employee(id).is_active);

        let twice = resign_directly(&store, &admin(), id, today).await;
        assert!(matches!(twice, Err(AppError::Conflict(_))));

        let after = apply(&store, &employee(id), None, today).await;
        assert!(matches!(after, Err(AppError::Conflict(_))));
    }

    #[actix_web::test]
    async fn listing_is_scoped_to_the_caller() {
        let store = MemoryStore::new();
        let dept = store.seed_department("销售科");
        let a = store.seed_employee("甲", "销售代表", dept, true);
        let b = store.seed_employee("乙", "客户经理", dept, true);
        let today = day(2024, 5, 1);
        let ra = apply(&store, &employee(a), None, today).await.unwrap();
        apply(&store, &employee(b), None, today).await.unwrap();

        let mine = list(&store, &employee(a), None, None).await.unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.data[0].employee_id, a);

        let all = list(&store, &admin(), Some(ResignationStatus::Pending), None).await.unwrap();
        assert_eq!(all.total, 2);

        assert!(get(&store, &employee(a), ra.id).await.is_ok());
        assert!(matches!(get(&store, &employee(b), ra.id).await, Err(AppError::Forbidden(_))));

        let far = list(&store, &admin(), None, Some(u64::MAX)).await.unwrap();
        assert!(far.data.is_empty());
        assert_eq!(far.total, 2);
    }
}
