// tokenizer.rs

/// Forward-only cursor producing delimiter-separated tokens of one line.
///
/// Each call skips a run of delimiters, returns the following run of
/// non-delimiters, and steps over one trailing delimiter. Once exhausted
/// it stays exhausted; retokenizing needs a fresh `Tokenizer`.
#[derive(Clone, Debug)]
pub struct Tokenizer<'a> {
    line: &'a str,
    pos: Option<usize>,
    delimiters: &'a [char],
}

pub const WHITESPACE: &[char] = &[' ', '\t'];
pub const SPACE: &[char] = &[' '];

impl<'a> Tokenizer<'a> {
    pub fn new(line: &'a str, delimiters: &'a [char]) -> Self {
        Self { line, pos: Some(0), delimiters }
    }

    pub fn next_token(&mut self) -> Option<&'a str> {
        self.next_spanned().map(|(_, token)| token)
    }

    /// Like `next_token`, also returning the token's byte offset in the line.
    pub fn next_spanned(&mut self) -> Option<(usize, &'a str)> {
        let pos = self.pos?;
        let rest = &self.line[pos..];
        let start = match rest.find(|c: char| !self.is_delimiter(c)) {
            Some(skip) => pos + skip,
            None => {
                self.pos = None;
                return None;
            }
        };
        let end = self.line[start..]
            .find(|c: char| self.is_delimiter(c))
            .map_or(self.line.len(), |len| start + len);
        self.pos = match self.line[end..].chars().next() {
            Some(delim) => Some(end + delim.len_utf8()),
            None => None,
        };
        Some((start, &self.line[start..end]))
    }

    /// Text not yet consumed, starting right after the last delimiter stepped over.
    pub fn remainder(&self) -> &'a str {
        self.pos.map_or("", |pos| &self.line[pos..])
    }

    fn is_delimiter(&self, c: char) -> bool {
        self.delimiters.contains(&c)
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_runs_of_delimiters() {
        let tokens: Vec<&str> = Tokenizer::new("  ls \t -l   /tmp ", WHITESPACE).collect();
        assert_eq!(tokens, vec!["ls", "-l", "/tmp"]);
    }

    #[test]
    fn empty_and_blank_lines_yield_nothing() {
        assert_eq!(Tokenizer::new("", WHITESPACE).next_token(), None);
        assert_eq!(Tokenizer::new(" \t  ", WHITESPACE).next_token(), None);
    }

    #[test]
    fn exhausted_cursor_stays_exhausted() {
        let mut tokens = Tokenizer::new("one", WHITESPACE);
        assert_eq!(tokens.next_token(), Some("one"));
        assert_eq!(tokens.next_token(), None);
        assert_eq!(tokens.next_token(), None);
    }

    #[test]
    fn space_only_delimiters_keep_tabs_inside_tokens() {
        let tokens: Vec<&str> = Tokenizer::new("a\tb c", SPACE).collect();
        assert_eq!(tokens, vec!["a\tb", "c"]);
    }

    #[test]
    fn spans_point_into_the_line() {
        let mut tokens = Tokenizer::new(" ab  cd", SPACE);
        assert_eq!(tokens.next_spanned(), Some((1, "ab")));
        assert_eq!(tokens.remainder(), " cd");
        assert_eq!(tokens.next_spanned(), Some((5, "cd")));
        assert_eq!(tokens.remainder(), "");
    }

    #[test]
    fn handles_multibyte_text() {
        let tokens: Vec<&str> = Tokenizer::new("échо  ü", SPACE).collect();
        assert_eq!(tokens, vec!["échо", "ü"]);
    }
}
