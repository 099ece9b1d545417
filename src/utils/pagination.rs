use actix_web::HttpRequest;

use crate::models::response::Paginated;
use crate::utils::errors::ServiceError;

/// Number of records on every list page.
pub const PAGE_SIZE: i64 = 10;

/// The `page` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelector {
    Number(i64),
    Last,
}

impl Default for PageSelector {
    fn default() -> Self {
        PageSelector::Number(1)
    }
}

impl PageSelector {
    pub fn parse(raw: Option<&str>) -> Result<Self, ServiceError> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(PageSelector::default()),
            Some(raw) => raw,
        };
        if raw == "last" {
            return Ok(PageSelector::Last);
        }
        match raw.parse::<i64>() {
            Ok(n) if n >= 1 => Ok(PageSelector::Number(n)),
            _ => Err(ServiceError::invalid_page()),
        }
    }

    /// Resolves to a concrete page number once the total is known.
    /// Page 1 always exists, even for an empty collection.
    pub fn resolve(self, total: i64) -> Result<i64, ServiceError> {
        let num_pages = page_count(total);
        let page = match self {
            PageSelector::Number(n) => n,
            PageSelector::Last => num_pages,
        };
        if page > num_pages {
            return Err(ServiceError::invalid_page());
        }
        Ok(page)
    }
}

pub fn page_count(total: i64) -> i64 {
    ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1)
}

pub fn offset_for(page: i64) -> i64 {
    (page - 1) * PAGE_SIZE
}

/// One page of records as returned by a store.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
}

impl<T> Listing<T> {
    /// Slices an already filtered and ordered collection.
    pub fn from_vec(items: Vec<T>, selector: PageSelector) -> Result<Self, ServiceError> {
        let total = items.len() as i64;
        let page = selector.resolve(total)?;
        let items = items
            .into_iter()
            .skip(offset_for(page) as usize)
            .take(PAGE_SIZE as usize)
            .collect();
        Ok(Listing { items, total, page })
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
        }
    }

    pub fn into_envelope(self, req: &HttpRequest) -> Paginated<T> {
        let has_next = self.page < page_count(self.total);
        let next = has_next.then(|| page_link(req, self.page + 1));
        let previous = (self.page > 1).then(|| page_link(req, self.page - 1));
        Paginated {
            count: self.total,
            next,
            previous,
            results: self.items,
        }
    }
}

/// Absolute URL of the current request with `page` replaced. Page 1 drops
/// the parameter entirely.
fn page_link(req: &HttpRequest, page: i64) -> String {
    let info = req.connection_info();
    let mut pairs: Vec<String> = req
        .query_string()
        .split('&')
        .filter(|pair| !pair.is_empty() && *pair != "page" && !pair.starts_with("page="))
        .map(str::to_string)
        .collect();
    if page > 1 {
        pairs.push(format!("page={}", page));
    }

    let mut link = format!("{}://{}{}", info.scheme(), info.host(), req.path());
    if !pairs.is_empty() {
        link.push('?');
        link.push_str(&pairs.join("&"));
    }
    link
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    #[rstest]
    #[case(None, PageSelector::Number(1))]
    #[case(Some(""), PageSelector::Number(1))]
    #[case(Some("3"), PageSelector::Number(3))]
    #[case(Some("last"), PageSelector::Last)]
    fn parses_page_parameter(#[case] raw: Option<&str>, #[case] expected: PageSelector) {
        assert_eq!(PageSelector::parse(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("two")]
    fn rejects_invalid_page(#[case] raw: &str) {
        assert!(matches!(PageSelector::parse(Some(raw)), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn empty_collection_still_has_a_first_page() {
        assert_eq!(PageSelector::Number(1).resolve(0).unwrap(), 1);
        assert!(PageSelector::Number(2).resolve(0).is_err());
        assert_eq!(PageSelector::Last.resolve(0).unwrap(), 1);
    }

    #[test]
    fn second_page_of_fifteen_holds_the_remainder() {
        let listing = Listing::from_vec((1..=15).collect::<Vec<i32>>(), PageSelector::Number(2)).unwrap();
        assert_eq!(listing.items, (11..=15).collect::<Vec<_>>());
        assert_eq!(listing.total, 15);
        assert!(Listing::from_vec((1..=15).collect::<Vec<i32>>(), PageSelector::Number(3)).is_err());
    }

    #[test]
    fn envelope_links_keep_other_parameters() {
        let req = TestRequest::get()
            .uri("/api/tasks/?search=report&page=2")
            .insert_header(("host", "localhost:8080"))
            .to_http_request();
        let listing = Listing::from_vec((1..=25).collect::<Vec<i32>>(), PageSelector::Number(2)).unwrap();
        let envelope = listing.into_envelope(&req);

        assert_eq!(envelope.count, 25);
        assert_eq!(envelope.results.len(), 10);
        assert_eq!(
            envelope.next.as_deref(),
            Some("http://localhost:8080/api/tasks/?search=report&page=3")
        );
        assert_eq!(
            envelope.previous.as_deref(),
            Some("http://localhost:8080/api/tasks/?search=report")
        );
    }
}
