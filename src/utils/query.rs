use crate::utils::errors::{FieldErrors, ServiceError, INVALID_CHOICE};
use crate::utils::pagination::PageSelector;

/// A field a collection can be ordered by.
pub trait SortField: Copy + Sized {
    /// Looks up an allow-listed `ordering` name.
    fn from_param(name: &str) -> Option<Self>;

    /// SQL expression the field sorts on.
    fn column(self) -> &'static str;

    fn default_ordering() -> Vec<OrderTerm<Self>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm<S> {
    pub field: S,
    pub descending: bool,
}

impl<S> OrderTerm<S> {
    pub fn asc(field: S) -> Self {
        OrderTerm { field, descending: false }
    }

    pub fn desc(field: S) -> Self {
        OrderTerm { field, descending: true }
    }
}

/// Parses `ordering=a,-b`. Names outside the allow-list are dropped; when
/// nothing usable remains the collection default applies.
pub fn parse_ordering<S: SortField>(raw: Option<&str>) -> Vec<OrderTerm<S>> {
    let terms: Vec<OrderTerm<S>> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter_map(|term| {
            let (name, descending) = match term.strip_prefix('-') {
                Some(name) => (name, true),
                None => (term, false),
            };
            S::from_param(name).map(|field| OrderTerm { field, descending })
        })
        .collect();

    if terms.is_empty() {
        S::default_ordering()
    } else {
        terms
    }
}

/// Splits `search` into terms on whitespace and commas.
pub fn search_terms(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .replace('\0', "")
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// `true` when every term occurs, case-insensitively, in at least one field.
pub fn matches_search(terms: &[String], fields: &[&str]) -> bool {
    let fields: Vec<String> = fields.iter().map(|f| f.to_lowercase()).collect();
    terms.iter().all(|term| {
        let term = term.to_lowercase();
        fields.iter().any(|field| field.contains(&term))
    })
}

/// `ILIKE` pattern for a substring match, with wildcards in the term escaped.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Exact-match text filter; empty values mean "no filter".
pub fn text_filter(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.is_empty())
}

/// Reference filter given as an identifier; empty values mean "no filter".
pub fn id_filter(name: &str, raw: Option<&str>, errors: &mut FieldErrors) -> Option<i64> {
    match raw.map(str::trim) {
        None | Some("") => None,
        Some(value) => match value.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add(name, INVALID_CHOICE);
                None
            }
        },
    }
}

/// Everything a store needs to produce one page of a collection.
#[derive(Debug, Clone)]
pub struct ListQuery<F, S> {
    pub filter: F,
    pub search: Vec<String>,
    pub ordering: Vec<OrderTerm<S>>,
    pub page: PageSelector,
}

impl<F, S: SortField> ListQuery<F, S> {
    pub fn new(
        filter: F,
        search: Option<&str>,
        ordering: Option<&str>,
        page: Option<&str>,
    ) -> Result<Self, ServiceError> {
        Ok(ListQuery {
            filter,
            search: search_terms(search),
            ordering: parse_ordering(ordering),
            page: PageSelector::parse(page)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Field {
        Name,
        Date,
    }

    impl SortField for Field {
        fn from_param(name: &str) -> Option<Self> {
            match name {
                "name" => Some(Field::Name),
                "date" => Some(Field::Date),
                _ => None,
            }
        }

        fn column(self) -> &'static str {
            match self {
                Field::Name => "name",
                Field::Date => "date",
            }
        }

        fn default_ordering() -> Vec<OrderTerm<Self>> {
            vec![OrderTerm::asc(Field::Name)]
        }
    }

    #[rstest]
    #[case(None, vec![OrderTerm::asc(Field::Name)])]
    #[case(Some("-date"), vec![OrderTerm::desc(Field::Date)])]
    #[case(Some("date,-name"), vec![OrderTerm::asc(Field::Date), OrderTerm::desc(Field::Name)])]
    #[case(Some("password,-date"), vec![OrderTerm::desc(Field::Date)])]
    #[case(Some("bogus"), vec![OrderTerm::asc(Field::Name)])]
    fn ordering_respects_allow_list(#[case] raw: Option<&str>, #[case] expected: Vec<OrderTerm<Field>>) {
        assert_eq!(parse_ordering::<Field>(raw), expected);
    }

    #[test]
    fn search_splits_on_whitespace_and_commas() {
        assert_eq!(search_terms(Some(" quarterly, report  q3")), vec!["quarterly", "report", "q3"]);
        assert!(search_terms(Some("   ")).is_empty());
        assert!(search_terms(None).is_empty());
    }

    #[test]
    fn every_term_must_hit_some_field() {
        let terms = search_terms(Some("ali eng"));
        assert!(matches_search(&terms, &["Alice", "Engineering"]));
        assert!(!matches_search(&terms, &["Alice", "Sales"]));
        assert!(matches_search(&[], &["anything"]));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn id_filter_reports_bad_values() {
        let mut errors = FieldErrors::default();
        assert_eq!(id_filter("status", Some("4"), &mut errors), Some(4));
        assert_eq!(id_filter("status", Some(""), &mut errors), None);
        assert!(errors.is_empty());
        assert_eq!(id_filter("status", Some("open"), &mut errors), None);
        assert_eq!(errors.get("status"), Some(&[INVALID_CHOICE.to_string()][..]));
    }
}
