//! HTML parser for topic page counters
//!
//! A topic page shows its counters in a number board. Each value element
//! carries the exact count in its `title` attribute; the first is the
//! follower count and the last is the question count.

use scraper::{ElementRef, Html, Selector};

/// Counters read from a topic page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicCounters {
    pub followers: Option<u64>,
    pub questions: Option<u64>,
}

/// Extracts the follower and question counters from a topic page
///
/// A counter whose element or `title` attribute is missing is `None`.
///
/// # Returns
///
/// * `Ok(TopicCounters)` - The counters found on the page
/// * `Err(String)` - A `title` attribute is present but is not a count
///
/// # Example
///
/// ```
/// use graph_harvest::crawler::parse_topic_counters;
///
/// let html = r#"<div class="NumberBoard">
///     <strong class="NumberBoard-itemValue" title="1024">1,024</strong>
///     <strong class="NumberBoard-itemValue" title="77">77</strong>
/// </div>"#;
/// let counters = parse_topic_counters(html).unwrap();
/// assert_eq!(counters.followers, Some(1024));
/// assert_eq!(counters.questions, Some(77));
/// ```
pub fn parse_topic_counters(html: &str) -> Result<TopicCounters, String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(".NumberBoard-itemValue")
        .map_err(|e| format!("invalid counter selector: {:?}", e))?;

    let values: Vec<ElementRef> = document.select(&selector).collect();

    Ok(TopicCounters {
        followers: values.first().map(|e| counter(e, "follower")).transpose()?.flatten(),
        questions: values.last().map(|e| counter(e, "question")).transpose()?.flatten(),
    })
}

fn counter(element: &ElementRef, label: &str) -> Result<Option<u64>, String> {
    match element.value().attr("title") {
        Some(title) => title
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| format!("{} count '{}' is not a number: {}", label, title, e)),
        None => Ok(None),
    }
}
