//! Syndication surfaces: CSV, RSS 2.0 and Atom.
//!
//! Feeds start with the XML declaration and are indented with two spaces.
//! RSS dates are RFC1123Z, Atom dates RFC3339; items without a publication
//! date omit the element entirely.

use chrono::{DateTime, SecondsFormat, Utc};

use super::SearchResults;

const CSV_HEADER: &str = "Title,URL,Content,Engine,Category,Domain,Author,Published,Score";

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render the paginated result page as CSV.
pub fn to_csv(results: &SearchResults) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for r in &results.results {
        let published = r
            .published_at
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();
        let row = [
            csv_field(&r.title),
            csv_field(&r.url),
            csv_field(&r.content),
            csv_field(&r.engine),
            csv_field(r.category.as_str()),
            csv_field(&r.domain),
            csv_field(r.author.as_deref().unwrap_or("")),
            csv_field(&published),
            format!("{:.2}", r.score),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn rfc1123z(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

/// Render the paginated result page as an RSS 2.0 channel.
pub fn to_rss(results: &SearchResults, site_url: &str) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<rss version=\"2.0\">\n");
    out.push_str("  <channel>\n");
    out.push_str(&format!(
        "    <title>Search results for {}</title>\n",
        xml_escape(&results.query)
    ));
    out.push_str(&format!("    <link>{}</link>\n", xml_escape(site_url)));
    out.push_str(&format!(
        "    <description>{} results across {} engines</description>\n",
        results.pagination.total,
        results.engines_used.len()
    ));
    for r in &results.results {
        out.push_str("    <item>\n");
        out.push_str(&format!("      <title>{}</title>\n", xml_escape(&r.title)));
        out.push_str(&format!("      <link>{}</link>\n", xml_escape(&r.url)));
        if !r.content.is_empty() {
            out.push_str(&format!(
                "      <description>{}</description>\n",
                xml_escape(&r.content)
            ));
        }
        out.push_str(&format!(
            "      <guid isPermaLink=\"true\">{}</guid>\n",
            xml_escape(&r.url)
        ));
        if let Some(published) = &r.published_at {
            out.push_str(&format!("      <pubDate>{}</pubDate>\n", rfc1123z(published)));
        }
        out.push_str("    </item>\n");
    }
    out.push_str("  </channel>\n");
    out.push_str("</rss>\n");
    out
}

fn rfc3339(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render the paginated result page as an Atom feed.
pub fn to_atom(results: &SearchResults, site_url: &str) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<feed xmlns=\"http://www.w3.org/2005/Atom\">\n");
    out.push_str(&format!(
        "  <title>Search results for {}</title>\n",
        xml_escape(&results.query)
    ));
    out.push_str(&format!("  <id>{}</id>\n", xml_escape(site_url)));
    out.push_str(&format!("  <updated>{}</updated>\n", rfc3339(&Utc::now())));
    out.push_str(&format!(
        "  <link href=\"{}\" rel=\"self\"/>\n",
        xml_escape(site_url)
    ));
    for r in &results.results {
        out.push_str("  <entry>\n");
        out.push_str(&format!("    <title>{}</title>\n", xml_escape(&r.title)));
        out.push_str(&format!("    <link href=\"{}\"/>\n", xml_escape(&r.url)));
        out.push_str(&format!("    <id>{}</id>\n", xml_escape(&r.url)));
        if !r.content.is_empty() {
            out.push_str(&format!(
                "    <summary>{}</summary>\n",
                xml_escape(&r.content)
            ));
        }
        if let Some(published) = &r.published_at {
            out.push_str(&format!("    <published>{}</published>\n", rfc3339(published)));
            out.push_str(&format!("    <updated>{}</updated>\n", rfc3339(published)));
        }
        out.push_str("  </entry>\n");
    }
    out.push_str("</feed>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::pagination::PageInfo;
    use crate::domains::query::{Category, SortOrder};
    use crate::domains::results::{Facets, SearchResult};
    use chrono::TimeZone;

    fn sample() -> SearchResults {
        let mut dated = SearchResult::new(
            "Dated, \"quoted\"",
            "https://example.com/a",
            "wikipedia",
            Category::General,
        );
        dated.content = "first <result>".to_string();
        dated.domain = "example.com".to_string();
        dated.score = 1.2345;
        dated.published_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());

        let mut undated =
            SearchResult::new("Undated", "https://example.org/b", "brave", Category::General);
        undated.domain = "example.org".to_string();
        undated.score = 0.5;

        SearchResults {
            query: "rust & things".to_string(),
            category: Category::General,
            results: vec![dated, undated],
            pagination: PageInfo::new(1, 20, 2),
            search_time_ms: 12,
            engines_used: vec!["brave".to_string(), "wikipedia".to_string()],
            suggestions: None,
            sort: SortOrder::Relevance,
            facets: Facets::default(),
        }
    }

    #[test]
    fn csv_has_exact_header_and_quoting() {
        let csv = to_csv(&sample());
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));

        let first = lines.next().unwrap();
        assert!(first.starts_with("\"Dated, \"\"quoted\"\"\""));
        assert!(first.ends_with("1.23"));
        assert!(first.contains("2024-03-01T12:00:00Z"));

        // No published date leaves the column empty.
        let second = lines.next().unwrap();
        assert!(second.contains(",,0.50"));
    }

    #[test]
    fn rss_declares_version_and_uses_rfc1123z() {
        let rss = to_rss(&sample(), "https://search.example.net");
        assert!(rss.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">"));
        assert!(rss.contains("<pubDate>Fri, 01 Mar 2024 12:00:00 +0000</pubDate>"));
        assert!(rss.contains("rust &amp; things"));
        // Undated item has no pubDate element.
        assert_eq!(rss.matches("<pubDate>").count(), 1);
    }

    #[test]
    fn atom_declares_namespace_and_uses_rfc3339() {
        let atom = to_atom(&sample(), "https://search.example.net");
        assert!(atom.contains("<feed xmlns=\"http://www.w3.org/2005/Atom\">"));
        assert!(atom.contains("<published>2024-03-01T12:00:00Z</published>"));
        assert_eq!(atom.matches("<published>").count(), 1);
        assert!(atom.contains("first &lt;result&gt;"));
    }
}
