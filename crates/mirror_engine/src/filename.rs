/// Local file name for a direct download url.
///
/// Last path segment without query or fragment; when that has no extension,
/// `{title}.zip`. Characters Windows rejects are replaced with `_`.
pub fn download_filename(direct_url: &str, title: Option<&str>) -> String {
    let segment = direct_url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let raw = if segment.contains('.') {
        segment.to_string()
    } else {
        let title = title.map(str::trim).filter(|t| !t.is_empty());
        format!("{}.zip", title.unwrap_or("game"))
    };
    let mut name: String = raw
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    if is_reserved_windows_name(name.split('.').next().unwrap_or_default()) {
        name.insert(0, '_');
    }
    name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(stem: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem))
}
