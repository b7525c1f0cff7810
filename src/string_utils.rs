use memchr::memchr;

const LOB_PLACEHOLDERS: [&[u8]; 2] = [b"{$blobfile=", b"{$clobfile="];

/// Whether `text` references an external LOB file through a
/// `{$blobfile=...}` or `{$clobfile=...}` placeholder (any letter case).
pub(crate) fn contains_lob_placeholder(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while let Some(offset) = memchr(b'{', &bytes[i..]) {
        let at = &bytes[i + offset..];
        if LOB_PLACEHOLDERS
            .iter()
            .any(|p| at.len() >= p.len() && at[..p.len()].eq_ignore_ascii_case(p))
        {
            return true;
        }
        i += offset + 1;
    }
    false
}

/// Remove the quotes that delimit quoted regions of `field`.
///
/// Inside a region only its own quote character closes it; any other
/// quote character is kept as text. `escape` protects the character after it.
pub(crate) fn strip_quotes(field: &str, quote_chars: &[char], escape: Option<char>) -> String {
    let mut result = String::with_capacity(field.len());
    let mut open: Option<char> = None;
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if Some(c) == escape {
            result.push(c);
            if let Some(next) = chars.next() {
                result.push(next);
            }
            continue;
        }
        match open {
            Some(quote) if c == quote => open = None,
            None if quote_chars.contains(&c) => open = Some(c),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lob_placeholder() {
        assert!(contains_lob_placeholder("insert into t values ({$blobfile=/tmp/a.bin})"));
        assert!(contains_lob_placeholder("update t set c = {$ClobFile=c:/x.txt encoding=UTF-8}"));
        assert!(!contains_lob_placeholder("select '{$blob}' from t"));
        assert!(!contains_lob_placeholder("{$blobfile"));
        assert!(!contains_lob_placeholder(""));
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("'a','b'", &['\''], None), "a,b");
        assert_eq!(strip_quotes("\"x\"", &['\'', '"'], None), "x");
        assert_eq!(strip_quotes("'it\\'s'", &['\''], Some('\\')), "it\\'s");
    }

    #[test]
    fn test_strip_quotes_keeps_other_quote_chars() {
        let quotes = ['\'', '"'];
        assert_eq!(strip_quotes("quoteChar='\"'", &quotes, None), "quoteChar=\"");
        assert_eq!(strip_quotes("msg=\"it's\"", &quotes, None), "msg=it's");
        assert_eq!(strip_quotes("'a \"b\" c'", &quotes, None), "a \"b\" c");
        assert_eq!(strip_quotes("'open \"", &quotes, None), "open \"");
    }
}
