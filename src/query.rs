//! List queries: pagination, free-text search and date filters
//!
//! [`ListQuery`] is shared by both ends. The client turns it into a canonical
//! query string; the server deserializes it from the same string, resolves it
//! and applies it to a sea-orm select of any [`Searchable`] entity.

use chrono::{Datelike, NaiveDate};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, Select};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
/// Highest page a list accepts
pub const MAX_PAGE: u64 = 1_000_000;

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

/// Filter state of a list page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub search_field: Option<String>,
    /// Exact day, `YYYY-MM-DD`
    #[serde(default)]
    pub tanggal: Option<String>,
    /// Whole month, `YYYY-MM`
    #[serde(default)]
    pub bulan: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            search: None,
            search_field: None,
            tanggal: None,
            bulan: None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ListQuery {
    /// Key/value pairs in canonical order. `page` and `limit` are always
    /// present; optional filters only when non-blank.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        let optional = [
            ("search", &self.search),
            ("searchField", &self.search_field),
            ("tanggal", &self.tanggal),
            ("bulan", &self.bulan),
        ];
        for (key, value) in optional {
            if let Some(v) = non_empty(value) {
                pairs.push((key, v.to_string()));
            }
        }
        pairs
    }

    pub fn to_query_string(&self) -> String {
        serde_urlencoded::to_string(self.to_pairs()).unwrap_or_default()
    }

    /// Same filters without paging, as used by exports
    pub fn without_paging(&self) -> Vec<(&'static str, String)> {
        self.to_pairs()
            .into_iter()
            .filter(|(k, _)| *k != "page" && *k != "limit")
            .collect()
    }

    /// Normalize and validate for use in a database query
    pub fn resolve(&self) -> AppResult<ResolvedQuery> {
        let search = non_empty(&self.search).map(|term| Search {
            field: non_empty(&self.search_field).map(str::to_string),
            term: term.to_string(),
        });

        let tanggal = match non_empty(&self.tanggal) {
            Some(raw) => Some(parse_tanggal(raw)?),
            None => None,
        };

        let bulan = match non_empty(&self.bulan) {
            Some(raw) => Some(month_range(raw)?),
            None => None,
        };

        if self.page > MAX_PAGE {
            return Err(AppError::Validation(format!(
                "halaman tidak boleh lebih dari {}",
                MAX_PAGE
            )));
        }

        Ok(ResolvedQuery {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_LIMIT),
            search,
            tanggal,
            bulan,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    pub field: Option<String>,
    pub term: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub page: u64,
    pub limit: u64,
    pub search: Option<Search>,
    pub tanggal: Option<NaiveDate>,
    /// Half-open range `[start, end)`
    pub bulan: Option<(NaiveDate, NaiveDate)>,
}

impl ResolvedQuery {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

fn parse_tanggal(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("format tanggal tidak valid: {}", raw)))
}

fn month_range(raw: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let invalid = || AppError::Validation(format!("format bulan tidak valid: {}", raw));

    let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let end = if start.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;

    Ok((start, end))
}

/// How a named search field maps onto a column
#[derive(Debug, Clone, Copy)]
pub enum SearchTarget<C> {
    /// Case-insensitive substring match
    Text(C),
    /// Exact integer match
    Number(C),
}

/// Entities that can be listed through [`ListQuery`]
pub trait Searchable: EntityTrait {
    /// Fields searched when the request does not name one
    const DEFAULT_SEARCH: &'static [&'static str];

    fn search_target(field: &str) -> Option<SearchTarget<Self::Column>>;

    /// Column filtered by `tanggal` and `bulan`
    fn date_column() -> Self::Column;
}

/// Apply search and date filters from a resolved query
pub fn apply_filters<E: Searchable>(select: Select<E>, query: &ResolvedQuery) -> AppResult<Select<E>> {
    let mut cond = Condition::all();

    if let Some(search) = &query.search {
        cond = cond.add(search_condition::<E>(search)?);
    }

    let date_col = E::date_column();
    if let Some(day) = query.tanggal {
        cond = cond.add(date_col.eq(day));
    }
    if let Some((start, end)) = query.bulan {
        cond = cond.add(date_col.gte(start)).add(date_col.lt(end));
    }

    Ok(select.filter(cond))
}

fn search_condition<E: Searchable>(search: &Search) -> AppResult<Condition> {
    match &search.field {
        Some(field) => {
            let target = E::search_target(field).ok_or_else(|| {
                AppError::Validation(format!("searchField tidak dikenal: {}", field))
            })?;
            Ok(Condition::all().add(target_expr::<E>(target, &search.term)))
        }
        None => {
            let mut any = Condition::any();
            for field in E::DEFAULT_SEARCH {
                if let Some(target) = E::search_target(field) {
                    any = any.add(target_expr::<E>(target, &search.term));
                }
            }
            Ok(any)
        }
    }
}

fn target_expr<E: EntityTrait>(target: SearchTarget<E::Column>, term: &str) -> SimpleExpr {
    match target {
        SearchTarget::Text(col) => {
            Expr::expr(Func::lower(Expr::col((E::default(), col)))).like(like_pattern(term))
        }
        SearchTarget::Number(col) => match term.trim().parse::<i64>() {
            Ok(n) => col.eq(n),
            Err(_) => Expr::value(false),
        },
    }
}

/// `%term%`, lowercased, with LIKE wildcards escaped
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Pagination block of a list envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        Self {
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(0, 1, DEFAULT_LIMIT)
    }
}

/// `{ data, pagination }` response of every list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEnvelope<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> ListEnvelope<T> {
    pub fn new(data: Vec<T>, total: u64, query: &ResolvedQuery) -> Self {
        Self {
            data,
            pagination: Pagination::new(total, query.page, query.limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::surat_masuk;
    use sea_orm::{DbBackend, QueryTrait};

    fn query() -> ListQuery {
        ListQuery::default()
    }

    #[test]
    fn test_query_string_only_paging_by_default() {
        assert_eq!(query().to_query_string(), "page=1&limit=10");
    }

    #[test]
    fn test_query_string_contains_exactly_non_empty_fields() {
        let q = ListQuery {
            page: 3,
            limit: 25,
            search: Some("undangan rapat".into()),
            search_field: Some("perihal".into()),
            tanggal: Some("".into()),
            bulan: Some("2024-05".into()),
        };
        assert_eq!(
            q.to_query_string(),
            "page=3&limit=25&search=undangan+rapat&searchField=perihal&bulan=2024-05"
        );
    }

    #[test]
    fn test_blank_search_is_dropped() {
        let q = ListQuery {
            search: Some("   ".into()),
            ..query()
        };
        let keys: Vec<_> = q.to_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["page", "limit"]);
    }

    #[test]
    fn test_query_string_parses_back() {
        let q = ListQuery {
            page: 2,
            search: Some("a&b=c".into()),
            tanggal: Some("2024-01-31".into()),
            ..query()
        };
        let parsed: ListQuery = serde_urlencoded::from_str(&q.to_query_string()).unwrap();
        assert_eq!(parsed, q);
    }

    #[test]
    fn test_resolve_clamps_paging() {
        let q = ListQuery {
            page: 0,
            limit: 1000,
            ..query()
        };
        let r = q.resolve().unwrap();
        assert_eq!(r.page, 1);
        assert_eq!(r.limit, MAX_LIMIT);
        assert_eq!(r.offset(), 0);

        let r = ListQuery { page: 4, limit: 20, ..query() }.resolve().unwrap();
        assert_eq!(r.offset(), 60);
    }

    #[test]
    fn test_resolve_dates() {
        let q = ListQuery {
            tanggal: Some("2024-03-15".into()),
            bulan: Some("2024-12".into()),
            ..query()
        };
        let r = q.resolve().unwrap();
        assert_eq!(r.tanggal, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(
            r.bulan,
            Some((
                NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
            ))
        );
    }

    #[test]
    fn test_resolve_rejects_bad_dates() {
        for (tanggal, bulan) in [(Some("15-03-2024"), None), (None, Some("2024-13")), (None, Some("Mei"))] {
            let q = ListQuery {
                tanggal: tanggal.map(String::from),
                bulan: bulan.map(String::from),
                ..query()
            };
            assert!(matches!(q.resolve(), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_huge_page_is_rejected() {
        let q = ListQuery {
            page: u64::MAX,
            limit: 1000,
            ..query()
        };
        assert!(matches!(q.resolve(), Err(AppError::Validation(_))));

        let last = ListQuery {
            page: MAX_PAGE,
            limit: 1000,
            ..query()
        }
        .resolve()
        .unwrap();
        assert_eq!(last.offset(), (MAX_PAGE - 1) * MAX_LIMIT);
    }

    #[test]
    fn test_offset_saturates() {
        let r = ResolvedQuery {
            page: u64::MAX,
            limit: MAX_LIMIT,
            search: None,
            tanggal: None,
            bulan: None,
        };
        assert_eq!(r.offset(), u64::MAX);
    }

    #[test]
    fn test_search_field_without_term_is_ignored() {
        let q = ListQuery {
            search_field: Some("perihal".into()),
            ..query()
        };
        assert!(q.resolve().unwrap().search.is_none());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" 50%_Off "), "%50\\%\\_off%");
    }

    #[test]
    fn test_pagination_total_pages() {
        assert_eq!(Pagination::new(0, 1, 10).total_pages, 0);
        assert_eq!(Pagination::new(10, 1, 10).total_pages, 1);
        assert_eq!(Pagination::new(11, 2, 10).total_pages, 2);
    }

    #[test]
    fn test_apply_filters_on_named_field() {
        let r = ListQuery {
            search: Some("Gubernur".into()),
            search_field: Some("asalSurat".into()),
            ..query()
        }
        .resolve()
        .unwrap();
        let sql = apply_filters(surat_masuk::Entity::find(), &r)
            .unwrap()
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#"LOWER("surat_masuk"."asal_surat") LIKE '%gubernur%'"#), "{}", sql);
        assert!(!sql.contains("perihal\") LIKE"), "{}", sql);
    }

    #[test]
    fn test_apply_filters_default_fields_are_or_ed() {
        let r = ListQuery {
            search: Some("rapat".into()),
            ..query()
        }
        .resolve()
        .unwrap();
        let sql = apply_filters(surat_masuk::Entity::find(), &r)
            .unwrap()
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(" OR "), "{}", sql);
        assert!(sql.contains("perihal"), "{}", sql);
    }

    #[test]
    fn test_apply_filters_numeric_field() {
        let r = ListQuery {
            search: Some("42".into()),
            search_field: Some("noUrut".into()),
            ..query()
        }
        .resolve()
        .unwrap();
        let sql = apply_filters(surat_masuk::Entity::find(), &r)
            .unwrap()
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""surat_masuk"."no_urut" = 42"#), "{}", sql);
    }

    #[test]
    fn test_apply_filters_month_range() {
        let r = ListQuery {
            bulan: Some("2024-02".into()),
            ..query()
        }
        .resolve()
        .unwrap();
        let sql = apply_filters(surat_masuk::Entity::find(), &r)
            .unwrap()
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("'2024-02-01'"), "{}", sql);
        assert!(sql.contains("'2024-03-01'"), "{}", sql);
    }

    #[test]
    fn test_unknown_search_field_is_rejected() {
        let r = ListQuery {
            search: Some("x".into()),
            search_field: Some("password".into()),
            ..query()
        }
        .resolve()
        .unwrap();
        assert!(matches!(
            apply_filters(surat_masuk::Entity::find(), &r),
            Err(AppError::Validation(_))
        ));
    }
}
