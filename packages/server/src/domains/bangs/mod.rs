//! Bang shortcuts: `!g foo` redirects to an upstream search instead of
//! running a metasearch.

use std::collections::HashMap;

use serde::Serialize;

use crate::domains::query::Category;

/// One shortcut entry. The URL template carries a `{query}` placeholder
/// replaced with the percent-encoded remainder of the input.
#[derive(Debug, Clone, Serialize)]
pub struct Bang {
    pub shortcut: &'static str,
    pub name: &'static str,
    pub url_template: &'static str,
    pub category: Category,
    pub aliases: &'static [&'static str],
}

const BUILTIN: &[Bang] = &[
    Bang {
        shortcut: "g",
        name: "Google",
        url_template: "https://www.google.com/search?q={query}",
        category: Category::General,
        aliases: &["google"],
    },
    Bang {
        shortcut: "ddg",
        name: "DuckDuckGo",
        url_template: "https://duckduckgo.com/?q={query}",
        category: Category::General,
        aliases: &["duckduckgo"],
    },
    Bang {
        shortcut: "b",
        name: "Brave Search",
        url_template: "https://search.brave.com/search?q={query}",
        category: Category::General,
        aliases: &["brave"],
    },
    Bang {
        shortcut: "w",
        name: "Wikipedia",
        url_template: "https://en.wikipedia.org/wiki/Special:Search?search={query}",
        category: Category::General,
        aliases: &["wp", "wiki"],
    },
    Bang {
        shortcut: "gh",
        name: "GitHub",
        url_template: "https://github.com/search?q={query}",
        category: Category::General,
        aliases: &["github"],
    },
    Bang {
        shortcut: "so",
        name: "Stack Overflow",
        url_template: "https://stackoverflow.com/search?q={query}",
        category: Category::General,
        aliases: &["stackoverflow"],
    },
    Bang {
        shortcut: "crates",
        name: "crates.io",
        url_template: "https://crates.io/search?q={query}",
        category: Category::General,
        aliases: &["crate"],
    },
    Bang {
        shortcut: "yt",
        name: "YouTube",
        url_template: "https://www.youtube.com/results?search_query={query}",
        category: Category::Videos,
        aliases: &["youtube"],
    },
    Bang {
        shortcut: "i",
        name: "Google Images",
        url_template: "https://www.google.com/search?tbm=isch&q={query}",
        category: Category::Images,
        aliases: &["img", "images"],
    },
    Bang {
        shortcut: "flickr",
        name: "Flickr",
        url_template: "https://www.flickr.com/search/?text={query}",
        category: Category::Images,
        aliases: &[],
    },
    Bang {
        shortcut: "hn",
        name: "Hacker News",
        url_template: "https://hn.algolia.com/?q={query}",
        category: Category::News,
        aliases: &["hackernews"],
    },
    Bang {
        shortcut: "r",
        name: "Reddit",
        url_template: "https://www.reddit.com/search/?q={query}",
        category: Category::News,
        aliases: &["reddit"],
    },
    Bang {
        shortcut: "osm",
        name: "OpenStreetMap",
        url_template: "https://www.openstreetmap.org/search?query={query}",
        category: Category::Maps,
        aliases: &["openstreetmap"],
    },
    Bang {
        shortcut: "gm",
        name: "Google Maps",
        url_template: "https://www.google.com/maps/search/{query}",
        category: Category::Maps,
        aliases: &["maps"],
    },
    Bang {
        shortcut: "a",
        name: "Amazon",
        url_template: "https://www.amazon.com/s?k={query}",
        category: Category::General,
        aliases: &["amazon"],
    },
    Bang {
        shortcut: "imdb",
        name: "IMDb",
        url_template: "https://www.imdb.com/find?q={query}",
        category: Category::General,
        aliases: &[],
    },
];

/// Case-insensitive lookup table over the built-in bangs and their aliases.
pub struct BangTable {
    bangs: &'static [Bang],
    index: HashMap<String, usize>,
}

impl Default for BangTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BangTable {
    pub fn builtin() -> Self {
        let mut index = HashMap::new();
        for (i, bang) in BUILTIN.iter().enumerate() {
            index.insert(bang.shortcut.to_ascii_lowercase(), i);
            for alias in bang.aliases {
                index.insert(alias.to_ascii_lowercase(), i);
            }
        }
        Self {
            bangs: BUILTIN,
            index,
        }
    }

    pub fn all(&self) -> &[Bang] {
        self.bangs
    }

    pub fn get(&self, shortcut: &str) -> Option<&Bang> {
        self.index
            .get(&shortcut.to_ascii_lowercase())
            .map(|&i| &self.bangs[i])
    }

    /// Filter the table for the discovery endpoint.
    pub fn filtered(&self, category: Option<Category>, search: Option<&str>) -> Vec<&Bang> {
        let needle = search.map(|s| s.trim().to_ascii_lowercase());
        self.bangs
            .iter()
            .filter(|b| category.map_or(true, |c| b.category == c))
            .filter(|b| {
                needle.as_deref().map_or(true, |n| {
                    b.shortcut.contains(n)
                        || b.name.to_ascii_lowercase().contains(n)
                        || b.aliases.iter().any(|a| a.contains(n))
                })
            })
            .collect()
    }

    /// Resolve raw input of the form `!shortcut rest` into a redirect URL.
    /// Unknown shortcuts return `None` and fall through to normal search.
    pub fn resolve(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        let stripped = raw.strip_prefix('!')?;
        if stripped.is_empty() {
            return None;
        }
        let (shortcut, rest) = match stripped.split_once(char::is_whitespace) {
            Some((shortcut, rest)) => (shortcut, rest.trim()),
            None => (stripped, ""),
        };
        let bang = self.get(shortcut)?;
        Some(
            bang.url_template
                .replace("{query}", &urlencoding::encode(rest)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_substitutes_percent_encoded_query() {
        let table = BangTable::builtin();
        assert_eq!(
            table.resolve("!g rust async traits").as_deref(),
            Some("https://www.google.com/search?q=rust%20async%20traits")
        );
    }

    #[test]
    fn lookup_is_case_insensitive_and_covers_aliases() {
        let table = BangTable::builtin();
        assert_eq!(
            table.resolve("!GH tokio").as_deref(),
            Some("https://github.com/search?q=tokio")
        );
        assert_eq!(
            table.resolve("!wiki rust").as_deref(),
            Some("https://en.wikipedia.org/wiki/Special:Search?search=rust")
        );
    }

    #[test]
    fn unknown_bang_falls_through() {
        let table = BangTable::builtin();
        assert!(table.resolve("!nosuchbang query").is_none());
        assert!(table.resolve("plain query").is_none());
        assert!(table.resolve("!").is_none());
    }

    #[test]
    fn bare_bang_redirects_with_empty_query() {
        let table = BangTable::builtin();
        assert_eq!(
            table.resolve("!ddg").as_deref(),
            Some("https://duckduckgo.com/?q=")
        );
    }

    #[test]
    fn filtered_respects_category_and_search() {
        let table = BangTable::builtin();
        let videos = table.filtered(Some(Category::Videos), None);
        assert!(videos.iter().all(|b| b.category == Category::Videos));
        assert!(!videos.is_empty());

        let wiki = table.filtered(None, Some("wiki"));
        assert!(wiki.iter().any(|b| b.shortcut == "w"));
    }
}
