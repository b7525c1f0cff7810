use compact_str::CompactString;

use crate::string_utils::strip_quotes;

/// Flags for [`ArgumentTokenizer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentOptions {
    /// A delimiter only counts at the start of the line or after whitespace.
    pub delimiter_needs_whitespace: bool,
    /// Emit every delimiter as a field of its own, after the field it ends.
    pub return_delimiter: bool,
    pub keep_quotes: bool,
    /// Drop the empty fields produced by consecutive delimiters.
    pub collapse_delimiters: bool,
    /// Character that protects the following one from quoting and splitting.
    pub escape: Option<char>,
    /// Treat the delimiter string as one multi-character delimiter instead
    /// of a set of single-character delimiters.
    pub single_delimiter: bool,
}

/// Splits command-line style strings into fields while respecting quotes.
#[derive(Debug, Clone)]
pub struct ArgumentTokenizer {
    delimiter: String,
    quote_chars: Vec<char>,
    options: ArgumentOptions,
}

impl ArgumentTokenizer {
    pub fn new(delimiter: &str, quote_chars: &str, options: ArgumentOptions) -> Self {
        Self {
            delimiter: delimiter.to_string(),
            quote_chars: quote_chars.chars().collect(),
            options,
        }
    }

    /// Lazily iterate the fields of `line`. Calling it again restarts from
    /// the beginning.
    pub fn fields<'a>(&'a self, line: &'a str) -> Fields<'a> {
        Fields {
            tokenizer: self,
            line,
            pos: 0,
            seen_delimiter: false,
            pending_delimiter: None,
            finished: false,
        }
    }

    pub fn split(&self, line: &str) -> Vec<String> {
        self.fields(line).collect()
    }

    fn delimiter_len_at(&self, rest: &str) -> Option<usize> {
        if self.delimiter.is_empty() {
            return None;
        }
        if self.options.single_delimiter {
            return rest.starts_with(&self.delimiter).then_some(self.delimiter.len());
        }
        let c = rest.chars().next()?;
        self.delimiter.contains(c).then_some(c.len_utf8())
    }

    /// Byte range of the next delimiter outside quotes at or after `from`.
    fn find_delimiter(&self, line: &str, from: usize) -> Option<(usize, usize)> {
        let mut quote: Option<char> = None;
        let mut prev = line[..from].chars().next_back();
        let mut chars = line[from..].char_indices();
        while let Some((offset, c)) = chars.next() {
            let at = from + offset;
            if Some(c) == self.options.escape {
                prev = chars.next().map(|(_, escaped)| escaped);
                continue;
            }
            match quote {
                Some(open) => {
                    if c == open {
                        quote = None;
                    }
                }
                None if self.quote_chars.contains(&c) => quote = Some(c),
                None => {
                    let boundary = !self.options.delimiter_needs_whitespace
                        || prev.map_or(true, char::is_whitespace);
                    if boundary {
                        if let Some(len) = self.delimiter_len_at(&line[at..]) {
                            return Some((at, at + len));
                        }
                    }
                }
            }
            prev = Some(c);
        }
        None
    }

    fn finish(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if self.options.keep_quotes {
            trimmed.to_string()
        } else {
            strip_quotes(trimmed, &self.quote_chars, self.options.escape)
        }
    }
}

/// Iterator over the fields of one line, see [`ArgumentTokenizer::fields`].
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    tokenizer: &'a ArgumentTokenizer,
    line: &'a str,
    pos: usize,
    seen_delimiter: bool,
    pending_delimiter: Option<&'a str>,
    finished: bool,
}

impl Iterator for Fields<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if let Some(delimiter) = self.pending_delimiter.take() {
            return Some(delimiter.to_string());
        }
        while !self.finished {
            let Some((start, end)) = self.tokenizer.find_delimiter(self.line, self.pos) else {
                self.finished = true;
                let field = self.tokenizer.finish(&self.line[self.pos..]);
                return (!field.is_empty()).then_some(field);
            };

            let field = self.tokenizer.finish(&self.line[self.pos..start]);
            let leading = !self.seen_delimiter;
            self.seen_delimiter = true;
            self.pos = end;
            if self.tokenizer.options.return_delimiter {
                self.pending_delimiter = Some(&self.line[start..end]);
            }

            if !field.is_empty() || !(leading || self.tokenizer.options.collapse_delimiters) {
                return Some(field);
            }
            if let Some(delimiter) = self.pending_delimiter.take() {
                return Some(delimiter.to_string());
            }
        }
        None
    }
}

/// Split `line` with a one-off tokenizer.
pub fn split_arguments(
    line: &str,
    delimiter: &str,
    quote_chars: &str,
    options: ArgumentOptions,
) -> Vec<String> {
    ArgumentTokenizer::new(delimiter, quote_chars, options).split(line)
}

/// `-name=value` arguments of a command or macro call, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentList {
    entries: Vec<(CompactString, Option<String>)>,
}

impl ArgumentList {
    pub fn parse(line: &str) -> Self {
        let options = ArgumentOptions {
            delimiter_needs_whitespace: true,
            ..ArgumentOptions::default()
        };
        let entries = ArgumentTokenizer::new("-", "'\"", options)
            .fields(line)
            .map(|field| match field.split_once('=') {
                Some((name, value)) => {
                    (CompactString::from(name.trim()), Some(value.trim().to_string()))
                }
                None => (CompactString::from(field.as_str()), None),
            })
            .collect();
        Self { entries }
    }

    /// Value of the first argument named `name` (case-insensitive).
    /// `-flag` without `=` has no value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// `true`, `yes`, `on` and `1` are true; a bare `-flag` is true too.
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            None => default,
            Some((_, None)) => true,
            Some((_, Some(value))) => match value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                _ => default,
            },
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
