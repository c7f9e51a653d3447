//! Page-number pagination over ordered queries.
//!
//! A [`Paginator`] only knows the total row count and the page size; it
//! turns a [`PageRequest`] into the `LIMIT`/`OFFSET` window for the listing
//! query, and the rows that come back are wrapped in a [`Page`] that carries
//! everything a template needs to draw navigation links.

use err_derive::Error;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPage {
    #[error(display = "Page is not “last”, nor can it be converted to an int: {:?}", _0)]
    NotAnInteger(String),
    #[error(display = "That page number is less than 1")]
    LessThanOne,
    #[error(display = "That page contains no results (page {} of {})", _0, _1)]
    NoResults(u64, u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(i64),
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

/// The row window selected for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub number: u64,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub per_page: u64,
    pub is_paginated: bool,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u64>,
    pub next_page_number: Option<u64>,
}

impl PageRequest {
    /// Interpret the raw `page` query parameter. Absent or blank means the
    /// first page.
    pub fn parse(raw: Option<&str>) -> Result<Self, InvalidPage> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(PageRequest::Number(1)),
            Some(raw) => raw,
        };
        if raw == "last" {
            return Ok(PageRequest::Last);
        }
        raw.parse::<i64>()
            .map(PageRequest::Number)
            .map_err(|_| InvalidPage::NotAnInteger(raw.to_string()))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::Number(1)
    }
}

impl Paginator {
    pub fn new(count: i64, per_page: u64) -> Self {
        assert!(per_page > 0, "page size must be positive");
        let count = if count < 0 { 0 } else { count as u64 };
        Paginator { count, per_page }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// An empty listing still has one (empty) page.
    pub fn num_pages(&self) -> u64 {
        if self.count == 0 {
            1
        } else {
            (self.count + self.per_page - 1) / self.per_page
        }
    }

    pub fn window(&self, req: PageRequest) -> Result<Window, InvalidPage> {
        let num_pages = self.num_pages();
        let number = match req {
            PageRequest::Last => num_pages,
            PageRequest::Number(n) if n < 1 => return Err(InvalidPage::LessThanOne),
            PageRequest::Number(n) => n as u64,
        };
        if number > num_pages {
            return Err(InvalidPage::NoResults(number, num_pages));
        }
        let offset = ((number - 1) * self.per_page) as i64;
        let limit = self.per_page as i64;
        Ok(Window {
            number,
            offset,
            limit,
        })
    }

    pub fn page<T>(&self, window: Window, object_list: Vec<T>) -> Page<T> {
        let num_pages = self.num_pages();
        let number = window.number;
        let has_previous = number > 1;
        let has_next = number < num_pages;
        Page {
            object_list,
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
            is_paginated: num_pages > 1,
            has_previous,
            has_next,
            previous_page_number: if has_previous { Some(number - 1) } else { None },
            next_page_number: if has_next { Some(number + 1) } else { None },
        }
    }
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.object_list.iter()
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            object_list: self.object_list.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            per_page: self.per_page,
            is_paginated: self.is_paginated,
            has_previous: self.has_previous,
            has_next: self.has_next,
            previous_page_number: self.previous_page_number,
            next_page_number: self.next_page_number,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_or_blank_page_means_first() {
        assert_eq!(PageRequest::parse(None), Ok(PageRequest::Number(1)));
        assert_eq!(PageRequest::parse(Some("  ")), Ok(PageRequest::Number(1)));
    }

    #[test]
    fn parses_last_and_numbers() {
        assert_eq!(PageRequest::parse(Some("last")), Ok(PageRequest::Last));
        assert_eq!(PageRequest::parse(Some("3")), Ok(PageRequest::Number(3)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            PageRequest::parse(Some("two")),
            Err(InvalidPage::NotAnInteger("two".into()))
        );
    }

    #[test]
    fn empty_listing_has_a_single_empty_page() {
        let p = Paginator::new(0, 10);
        assert_eq!(p.num_pages(), 1);
        let w = p.window(PageRequest::Number(1)).expect("first page");
        assert_eq!(w.offset, 0);
        let page = p.page::<u32>(w, vec![]);
        assert!(!page.is_paginated);
        assert!(page.is_empty());
    }

    #[test]
    fn eleven_rows_at_ten_per_page_is_paginated() {
        let p = Paginator::new(11, 10);
        assert_eq!(p.num_pages(), 2);
        let w = p.window(PageRequest::default()).expect("window");
        assert_eq!((w.offset, w.limit), (0, 10));
        let page = p.page(w, (0..10).collect::<Vec<_>>());
        assert!(page.is_paginated);
        assert_eq!(page.len(), 10);
        assert!(page.has_next);
        assert_eq!(page.next_page_number, Some(2));
        assert_eq!(page.previous_page_number, None);
    }

    #[test]
    fn last_resolves_to_final_page() {
        let p = Paginator::new(31, 15);
        let w = p.window(PageRequest::Last).expect("window");
        assert_eq!(w.number, 3);
        assert_eq!(w.offset, 30);
    }

    #[test]
    fn out_of_range_pages_are_rejected() {
        let p = Paginator::new(5, 5);
        assert_eq!(
            p.window(PageRequest::Number(2)),
            Err(InvalidPage::NoResults(2, 1))
        );
        assert_eq!(
            p.window(PageRequest::Number(0)),
            Err(InvalidPage::LessThanOne)
        );
    }
}
