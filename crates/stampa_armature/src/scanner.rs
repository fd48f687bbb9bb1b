//! Forgiving tag scanner.
//!
//! Turns the template string into a stream of structural events delivered
//! to a [`ScanSink`]. At each position the scanner tries, in order: HTML
//! comment, conditional comment, doctype, end tag, start tag; anything
//! else is text, grown over any `<` that cannot start one of the above.
//! The scanner never fails: malformed input degrades to text.

use memchr::memchr;
use once_cell::sync::Lazy;
use regex::Regex;
use stampa_carton::{is_raw_text_tag, SmallVec, SourceRange, String};
use stampa_relief::{AttributeRaw, CompilerOptions, TransformContext};

/// A scanned start tag with its raw attribute sequence.
#[derive(Debug)]
pub struct OpenTag {
    pub tag: String,
    pub attrs: Vec<AttributeRaw>,
    /// Explicit `/>` or void-tag: the element closes immediately.
    pub self_closing: bool,
    pub range: SourceRange,
}

/// Receiver for scan events.
pub trait ScanSink {
    fn open_tag(&mut self, tag: OpenTag, cx: &mut TransformContext<'_>);
    fn close_tag(&mut self, tag: &str, range: SourceRange, cx: &mut TransformContext<'_>);
    fn text(&mut self, content: &str, range: SourceRange, cx: &mut TransformContext<'_>);
    fn comment(&mut self, content: &str, range: SourceRange, cx: &mut TransformContext<'_>);
}

struct StackEntry {
    tag: String,
    lower: String,
}

/// Scan `source`, delivering events to `sink`.
pub fn scan_template<S: ScanSink>(
    source: &str,
    options: &CompilerOptions,
    sink: &mut S,
    cx: &mut TransformContext<'_>,
) {
    TagScanner::new(source, options).run(sink, cx)
}

/// Scanner state: the cursor and the open-tag stack. One instance per
/// scan; nothing is shared.
pub struct TagScanner<'s, 'o> {
    source: &'s str,
    options: &'o CompilerOptions,
    index: usize,
    stack: SmallVec<[StackEntry; 8]>,
}

static RAW_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--(.*?)-->").unwrap());
static RAW_CDATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());

impl<'s, 'o> TagScanner<'s, 'o> {
    pub fn new(source: &'s str, options: &'o CompilerOptions) -> Self {
        Self {
            source,
            options,
            index: 0,
            stack: SmallVec::new(),
        }
    }

    fn last_tag(&self) -> Option<&str> {
        self.stack.last().map(|e| e.lower.as_str())
    }

    fn run<S: ScanSink>(mut self, sink: &mut S, cx: &mut TransformContext<'_>) {
        while self.index < self.source.len() {
            let last = self.index;

            match self.last_tag() {
                Some(tag) if is_raw_text_tag(tag) => {
                    let tag = tag.to_owned();
                    self.scan_raw_text(&tag, sink, cx);
                }
                _ => self.scan_structural(sink, cx),
            }

            if self.index == last {
                // No production consumed anything: flush the rest as text.
                let rest = &self.source[self.index..];
                let range = SourceRange::new(self.index, self.source.len());
                sink.text(rest, range, cx);
                if self.stack.is_empty() {
                    cx.warn(
                        format!("Mal-formatted tag at end of template: \"{}\"", rest),
                        range,
                    );
                }
                break;
            }
        }

        // Flush any tags still open at end of stream.
        self.match_end_tag_on_stack(None, SourceRange::new(self.index, self.index), sink, cx);
    }

    fn scan_structural<S: ScanSink>(&mut self, sink: &mut S, cx: &mut TransformContext<'_>) {
        let rest = &self.source[self.index..];
        let lt = memchr(b'<', rest.as_bytes());

        if lt == Some(0) {
            if rest.starts_with("<!--") {
                if let Some(close) = rest.find("-->") {
                    if self.options.comments {
                        let range = SourceRange::new(self.index, self.index + close + 3);
                        sink.comment(&rest[4..close], range, cx);
                    }
                    self.index += close + 3;
                    return;
                }
                // Unterminated comment degrades to text below.
            } else if rest.starts_with("<![") {
                if let Some(close) = rest.find("]>") {
                    self.index += close + 2;
                    return;
                }
            } else if starts_with_doctype(rest) {
                if let Some(gt) = rest.find('>') {
                    self.index += gt + 1;
                    return;
                }
            } else if let Some((tag, len)) = match_end_tag(rest) {
                let range = SourceRange::new(self.index, self.index + len);
                self.index += len;
                self.handle_end_tag(tag, range, sink, cx);
                return;
            } else if starts_start_tag(rest) {
                if let Some(open) = self.parse_start_tag() {
                    self.handle_start_tag(open, sink, cx);
                    return;
                }
            }
        }

        // Text, grown over any `<` that cannot start a production.
        let mut text_end = match lt {
            Some(pos) => pos,
            None => rest.len(),
        };
        loop {
            let tail = &rest[text_end..];
            if text_end >= rest.len()
                || tail.starts_with("<!--")
                || tail.starts_with("<![")
                || match_end_tag(tail).is_some()
                || starts_start_tag(tail)
            {
                break;
            }
            match tail[1..].find('<') {
                Some(next) => text_end += next + 1,
                None => {
                    text_end = rest.len();
                    break;
                }
            }
        }

        if text_end > 0 {
            let range = SourceRange::new(self.index, self.index + text_end);
            sink.text(&rest[..text_end], range, cx);
            self.index += text_end;
        }
    }

    /// Raw-text elements consume their body verbatim via string search for
    /// the matching end tag; no structural scanning happens inside.
    fn scan_raw_text<S: ScanSink>(
        &mut self,
        tag: &str,
        sink: &mut S,
        cx: &mut TransformContext<'_>,
    ) {
        let start = self.index;
        match find_end_tag_ci(self.source, tag, start) {
            Some((content_end, after)) => {
                let mut content = &self.source[start..content_end];
                if should_ignore_first_newline(tag, content) {
                    content = &content[1..];
                }
                if !content.is_empty() {
                    let unwrapped = unwrap_raw_markers(content);
                    sink.text(&unwrapped, SourceRange::new(start, content_end), cx);
                }
                let end_range = SourceRange::new(content_end, after);
                self.index = after;
                self.handle_end_tag(&self.source[content_end + 2..content_end + 2 + tag.len()]
                    .to_owned(), end_range, sink, cx);
            }
            None => {
                // No end tag: the rest of the input is the element's text.
                let content = &self.source[start..];
                if !content.is_empty() {
                    sink.text(content, SourceRange::new(start, self.source.len()), cx);
                }
                self.index = self.source.len();
            }
        }
    }

    fn parse_start_tag(&mut self) -> Option<OpenTag> {
        let bytes = self.source.as_bytes();
        let start = self.index;
        let name_end = scan_qname(bytes, start + 1)?;
        let tag = &self.source[start + 1..name_end];

        let mut attrs: Vec<AttributeRaw> = Vec::new();
        let mut i = name_end;
        let self_closing;
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                return None;
            }
            if bytes[i] == b'>' {
                self_closing = false;
                i += 1;
                break;
            }
            if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>') {
                self_closing = true;
                i += 2;
                break;
            }

            let attr_start = i;
            let name_end = scan_attr_name(bytes, i)?;
            let name = &self.source[attr_start..name_end];
            i = name_end;

            // Optional `= value`.
            let mut j = i;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let mut value = "";
            let mut value_end = name_end;
            if bytes.get(j) == Some(&b'=') {
                j += 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                match bytes.get(j) {
                    Some(&q @ (b'"' | b'\'')) => {
                        let vstart = j + 1;
                        let close = memchr(q, &bytes[vstart..])?;
                        value = &self.source[vstart..vstart + close];
                        value_end = vstart + close + 1;
                    }
                    Some(_) => {
                        let vstart = j;
                        let mut k = j;
                        while k < bytes.len()
                            && !bytes[k].is_ascii_whitespace()
                            && !matches!(bytes[k], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
                        {
                            k += 1;
                        }
                        if k == vstart {
                            return None;
                        }
                        value = &self.source[vstart..k];
                        value_end = k;
                    }
                    None => return None,
                }
                i = value_end;
            }

            attrs.push(AttributeRaw {
                name: name.into(),
                value: value.into(),
                range: SourceRange::new(attr_start, value_end),
            });
        }

        let range = SourceRange::new(start, i);
        self.index = i;
        Some(OpenTag {
            tag: tag.into(),
            attrs,
            self_closing,
            range,
        })
    }

    fn handle_start_tag<S: ScanSink>(
        &mut self,
        mut open: OpenTag,
        sink: &mut S,
        cx: &mut TransformContext<'_>,
    ) {
        let lower = open.tag.to_ascii_lowercase();

        if self.options.expect_html {
            // An open <p> is implicitly closed by non-phrasing content; a
            // left-open tag is closed by an identical following sibling.
            if self.last_tag() == Some("p")
                && stampa_carton::NON_PHRASING_TAGS.contains(lower.as_str())
            {
                self.match_end_tag_on_stack(Some("p"), open.range, sink, cx);
            }
            if (self.options.can_leave_open)(&lower) && self.last_tag() == Some(lower.as_str()) {
                self.match_end_tag_on_stack(Some(&lower), open.range, sink, cx);
            }
        }

        let unary = (self.options.is_void_tag)(&lower) || open.self_closing;
        open.self_closing = unary;
        if !unary {
            self.stack.push(StackEntry {
                tag: open.tag.clone(),
                lower: String::from(lower.as_str()),
            });
        }

        let is_pre = (self.options.is_pre_tag)(&lower);
        sink.open_tag(open, cx);

        // Browsers drop the first newline inside <pre>; textarea is handled
        // on the raw-text path.
        if is_pre && self.source[self.index..].starts_with('\n') {
            self.index += 1;
        }
    }

    fn handle_end_tag<S: ScanSink>(
        &mut self,
        tag: impl AsRef<str>,
        range: SourceRange,
        sink: &mut S,
        cx: &mut TransformContext<'_>,
    ) {
        self.match_end_tag_on_stack(Some(tag.as_ref()), range, sink, cx);
    }

    /// Pop the stack down to `tag` (or entirely for `None`), warning for
    /// every skipped tag and synthesizing the corresponding end events.
    fn match_end_tag_on_stack<S: ScanSink>(
        &mut self,
        tag: Option<&str>,
        range: SourceRange,
        sink: &mut S,
        cx: &mut TransformContext<'_>,
    ) {
        let lower = tag.map(|t| t.to_ascii_lowercase());

        let pos = match &lower {
            Some(name) => {
                match self
                    .stack
                    .iter()
                    .rposition(|e| e.lower.as_str() == name.as_str())
                {
                    Some(pos) => pos,
                    None => {
                        // A lone </br> acts as <br>, a lone </p> as <p></p>;
                        // any other stray end tag is dropped.
                        match name.as_str() {
                            "br" => {
                                sink.open_tag(
                                    OpenTag {
                                        tag: tag.unwrap().into(),
                                        attrs: Vec::new(),
                                        self_closing: true,
                                        range,
                                    },
                                    cx,
                                );
                            }
                            "p" => {
                                sink.open_tag(
                                    OpenTag {
                                        tag: tag.unwrap().into(),
                                        attrs: Vec::new(),
                                        self_closing: false,
                                        range,
                                    },
                                    cx,
                                );
                                sink.close_tag(tag.unwrap(), range, cx);
                            }
                            _ => {}
                        }
                        return;
                    }
                }
            }
            None => 0,
        };

        if self.stack.is_empty() {
            return;
        }

        for i in (pos..self.stack.len()).rev() {
            let entry_tag = self.stack[i].tag.clone();
            if i > pos || lower.is_none() {
                cx.warn(
                    format!("tag <{}> has no matching end tag.", entry_tag),
                    range,
                );
            }
            sink.close_tag(&entry_tag, range, cx);
        }
        self.stack.truncate(pos);
    }
}

fn starts_with_doctype(rest: &str) -> bool {
    rest.len() >= 9 && rest[..9].eq_ignore_ascii_case("<!doctype")
}

fn starts_start_tag(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.first() == Some(&b'<') && scan_qname(bytes, 1).is_some()
}

fn is_ncname_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ncname_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')
}

fn scan_ncname(bytes: &[u8], start: usize) -> Option<usize> {
    if start >= bytes.len() || !is_ncname_start(bytes[start]) {
        return None;
    }
    let mut i = start + 1;
    while i < bytes.len() && is_ncname_char(bytes[i]) {
        i += 1;
    }
    Some(i)
}

/// `name` or `ns:name`.
fn scan_qname(bytes: &[u8], start: usize) -> Option<usize> {
    let end = scan_ncname(bytes, start)?;
    if bytes.get(end) == Some(&b':') {
        if let Some(end2) = scan_ncname(bytes, end + 1) {
            return Some(end2);
        }
    }
    Some(end)
}

/// Attribute name: either the bracketed dynamic-argument grammar
/// (`:[x]`, `@[x]`, `#[x]`, `v-dir:[x]`, each with an optional modifier
/// tail) or the static grammar (any run free of whitespace and tag
/// punctuation).
fn scan_attr_name(bytes: &[u8], start: usize) -> Option<usize> {
    if let Some(end) = scan_dynamic_attr_name(bytes, start) {
        return Some(end);
    }
    let mut i = start;
    while i < bytes.len()
        && !bytes[i].is_ascii_whitespace()
        && !matches!(bytes[i], b'"' | b'\'' | b'<' | b'>' | b'/' | b'=')
    {
        i += 1;
    }
    (i > start).then_some(i)
}

fn scan_dynamic_attr_name(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    match bytes.get(i)? {
        b':' | b'@' | b'#' => i += 1,
        b'v' if bytes.get(i + 1) == Some(&b'-') => {
            i += 2;
            let word_start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
                i += 1;
            }
            if i == word_start || bytes.get(i) != Some(&b':') {
                return None;
            }
            i += 1;
        }
        _ => return None,
    }
    if bytes.get(i) != Some(&b'[') {
        return None;
    }
    i += 1;
    let arg_start = i;
    while i < bytes.len() && bytes[i] != b']' && bytes[i] != b'=' {
        i += 1;
    }
    if i == arg_start || bytes.get(i) != Some(&b']') {
        return None;
    }
    i += 1;
    // Modifier tail.
    while i < bytes.len()
        && !bytes[i].is_ascii_whitespace()
        && !matches!(bytes[i], b'"' | b'\'' | b'<' | b'>' | b'/' | b'=')
    {
        i += 1;
    }
    Some(i)
}

/// `</name ...>`: returns the tag name and the total consumed length.
fn match_end_tag(rest: &str) -> Option<(std::string::String, usize)> {
    let bytes = rest.as_bytes();
    if !rest.starts_with("</") {
        return None;
    }
    let name_end = scan_qname(bytes, 2)?;
    let gt = memchr(b'>', &bytes[name_end..])?;
    Some((rest[2..name_end].to_owned(), name_end + gt + 1))
}

/// Case-insensitive search for `</tag ...>`. Returns (content end, index
/// after the end tag).
fn find_end_tag_ci(source: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = source.as_bytes();
    let mut i = from;
    loop {
        let pos = memchr(b'<', &bytes[i..])? + i;
        // Byte-wise comparison: the candidate window may cut through a
        // multibyte character, which a str slice would reject.
        if bytes.get(pos + 1) == Some(&b'/')
            && bytes
                .get(pos + 2..pos + 2 + tag.len())
                .map_or(false, |name| name.eq_ignore_ascii_case(tag.as_bytes()))
        {
            let after_name = pos + 2 + tag.len();
            if let Some(gt) = memchr(b'>', &bytes[after_name..]) {
                return Some((pos, after_name + gt + 1));
            }
            return None;
        }
        i = pos + 1;
    }
}

fn should_ignore_first_newline(tag: &str, text: &str) -> bool {
    matches!(tag, "pre" | "textarea") && text.starts_with('\n')
}

/// Unwrap comment and CDATA markers left inside raw-text content.
fn unwrap_raw_markers(content: &str) -> std::string::String {
    let step = RAW_COMMENT_RE.replace_all(content, "$1");
    RAW_CDATA_RE.replace_all(&step, "$1").into_owned()
}
