//! The shared list/search/paginate path behind every index page.

use log::*;
use postgres::{GenericClient, Row};
use serde::{Deserialize, Serialize};
use tera::Context;

use infra::pagination::{Page, PageRequest, Paginator};
use infra::persistence::contains_pattern;

use crate::error::Result;

/// Raw query string of a list page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: PageRequest,
}

/// How one entity is listed: which rows, how they are filtered, and how
/// many per page.
#[derive(Debug, Clone, Copy)]
pub struct Listing {
    pub columns: &'static str,
    pub from: &'static str,
    pub search_column: &'static str,
    pub order_by: &'static str,
    pub per_page: u64,
}

/// What list templates see besides the page itself.
#[derive(Debug, Clone, Serialize)]
pub struct SearchState {
    pub search: String,
    /// Query string fragment carried over to pagination links.
    pub search_query: String,
}

impl ListQuery {
    pub fn from_params(params: ListParams) -> Result<Self> {
        let page = PageRequest::parse(params.page.as_deref())?;
        let search = params.search.filter(|s| !s.is_empty());
        Ok(ListQuery { search, page })
    }

    pub fn search_state(&self) -> SearchState {
        let search = self.search.clone().unwrap_or_default();
        let search_query = if search.is_empty() {
            String::new()
        } else {
            let encoded: String = url::form_urlencoded::byte_serialize(search.as_bytes()).collect();
            format!("&search={}", encoded)
        };
        SearchState {
            search,
            search_query,
        }
    }
}

impl Listing {
    fn filter(&self) -> String {
        format!("($1::text IS NULL OR {} ILIKE $1)", self.search_column)
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT count(*) FROM {} WHERE {}", self.from, self.filter())
    }

    pub fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {} LIMIT $2 OFFSET $3",
            self.columns,
            self.from,
            self.filter(),
            self.order_by
        )
    }

    /// Count the matching rows, then fetch the requested window of them.
    pub fn fetch<C, T, F>(&self, conn: &mut C, query: &ListQuery, from_row: F) -> Result<Page<T>>
    where
        C: GenericClient,
        F: Fn(&Row) -> T,
    {
        let pattern = query.search.as_deref().map(contains_pattern);

        let count: i64 = conn.query_one(self.count_sql().as_str(), &[&pattern])?.get(0);
        let paginator = Paginator::new(count, self.per_page);
        let window = paginator.window(query.page)?;
        debug!(
            "List {}: {} rows, page {} of {}",
            self.from,
            count,
            window.number,
            paginator.num_pages()
        );

        let rows = conn.query(
            self.select_sql().as_str(),
            &[&pattern, &window.limit, &window.offset],
        )?;
        let objects = rows.iter().map(from_row).collect();
        Ok(paginator.page(window, objects))
    }
}

/// Expose a page to a list template. The rows go under `list_name`, as
/// well as on the page itself.
pub fn insert_page<T: Serialize>(
    context: &mut Context,
    list_name: &str,
    page: &Page<T>,
    search: &SearchState,
) {
    context.insert(list_name, &page.object_list);
    context.insert("page", page);
    context.insert("is_paginated", &page.is_paginated);
    context.insert("search", &search.search);
    context.insert("search_query", &search.search_query);
}
