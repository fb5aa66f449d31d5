/// Placeholder reported for a metadata field with no match on the page.
pub const FIELD_DEFAULT: &str = "--";

/// Per-URL metadata accumulated over a crawl.
///
/// Fetch workers fill in the response fields (`status`, `server`,
/// `content_type`, `size`); the parse worker fills in the fields extracted
/// from the document body. A field is `None` until the corresponding worker
/// has reported it.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct PageMeta {
    pub status: Option<String>,
    pub server: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<String>,
    pub title: Option<String>,
    pub desc: Option<String>,
    pub kw: Option<String>,
    pub canonical: Option<String>,
    pub h1: Option<String>,
    pub h2: Option<String>,
}

impl PageMeta {
    /// Copies every field present in `other` over the matching field here.
    pub fn merge(&mut self, other: &PageMeta) {
        fill(&mut self.status, &other.status);
        fill(&mut self.server, &other.server);
        fill(&mut self.content_type, &other.content_type);
        fill(&mut self.size, &other.size);
        fill(&mut self.title, &other.title);
        fill(&mut self.desc, &other.desc);
        fill(&mut self.kw, &other.kw);
        fill(&mut self.canonical, &other.canonical);
        fill(&mut self.h1, &other.h1);
        fill(&mut self.h2, &other.h2);
    }
}

fn fill(dst: &mut Option<String>, src: &Option<String>) {
    if src.is_some() {
        dst.clone_from(src);
    }
}

/// Folds selector matches into a single field value: no matches yield the
/// placeholder, multiple matches are joined with `;` in document order.
pub(crate) fn collapse(values: Vec<String>) -> String {
    if values.is_empty() {
        FIELD_DEFAULT.to_string()
    } else {
        values.join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_uses_placeholder_when_empty() {
        assert_eq!(collapse(Vec::new()), FIELD_DEFAULT);
    }

    #[test]
    fn collapse_joins_in_order() {
        assert_eq!(collapse(vec!["Foo".into()]), "Foo");
        assert_eq!(collapse(vec!["Foo".into(), "Bar".into()]), "Foo;Bar");
    }

    #[test]
    fn merge_keeps_fields_absent_from_other() {
        let mut meta = PageMeta {
            status: Some("200".into()),
            server: Some("nginx".into()),
            ..PageMeta::default()
        };
        let parsed = PageMeta {
            title: Some("Hello".into()),
            h1: Some(FIELD_DEFAULT.into()),
            ..PageMeta::default()
        };
        meta.merge(&parsed);
        assert_eq!(meta.status.as_deref(), Some("200"));
        assert_eq!(meta.server.as_deref(), Some("nginx"));
        assert_eq!(meta.title.as_deref(), Some("Hello"));
        assert_eq!(meta.h1.as_deref(), Some(FIELD_DEFAULT));
        assert_eq!(meta.desc, None);
    }
}
