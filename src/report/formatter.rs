use anyhow::Result;
use chrono::{DateTime, Utc};

const FALLBACK_TITLE: &str = "Auto-generated Post";
const DEFAULT_TAGS: [&str; 3] = ["autopost", "murmur", "ai-generated"];
const DESCRIPTION: &str = "An automated blog post generated from logs and calendar events.";

/// Prepend site frontmatter to a generated post. Posts that already open
/// with a frontmatter block are returned trimmed but otherwise untouched.
pub fn format_markdown(content: &str, author: &str, now: DateTime<Utc>) -> Result<String> {
    let content = content.trim();
    if content.starts_with("---") {
        return Ok(content.to_string());
    }

    let title = extract_title(content)?;
    let slug = match slugify(&title)? {
        slug if slug.is_empty() => slugify(FALLBACK_TITLE)?,
        slug => slug,
    };
    let tags = extract_tags(content);
    let pub_date = now.format("%Y-%m-%dT%H:%M:%SZ");

    let tags_yaml = tags
        .iter()
        .map(|t| format!("  - {}", t))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(format!(
        "---\n\
         author: {author}\n\
         pubDatetime: {pub_date}\n\
         modDatetime: {pub_date}\n\
         title: {title}\n\
         slug: {slug}\n\
         featured: false\n\
         draft: false\n\
         tags:\n\
         {tags_yaml}\n\
         description: {DESCRIPTION}\n\
         ---\n\n\
         {content}"
    ))
}

/// First line of the post with heading/emphasis markers and YAML-hostile
/// characters removed.
fn extract_title(content: &str) -> Result<String> {
    let first_line = content.lines().next().unwrap_or("");
    let re = regex::Regex::new(r#"[:"\\*#_`]"#)?;
    let title = re.replace_all(first_line, "").trim().to_string();

    if title.is_empty() {
        Ok(FALLBACK_TITLE.to_string())
    } else {
        Ok(title)
    }
}

pub fn slugify(title: &str) -> Result<String> {
    let re = regex::Regex::new(r"[^a-z0-9]+")?;
    let lowered = title.to_lowercase();
    Ok(re.replace_all(&lowered, "-").trim_matches('-').to_string())
}

fn extract_tags(content: &str) -> Vec<String> {
    let tags: Vec<String> = content
        .lines()
        .find(|line| line.to_lowercase().starts_with("tags:"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, rest)| {
            rest.split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if tags.is_empty() {
        DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()
    } else {
        tags
    }
}
