use logfork_types::LogRecord;

/// Parser for Common Log Format access-log lines
pub struct LogParser;

impl LogParser {
    /// Parse a raw log line into a LogRecord
    ///
    /// Never fails: quotes and brackets are dropped, the rest is split on
    /// single spaces and assigned positionally. Missing fields stay empty.
    pub fn parse(raw: &str) -> LogRecord {
        let cleaned = Self::strip_delimiters(raw);
        LogRecord::from_tokens(cleaned.split(' '))
    }

    /// Remove `"`, `[` and `]` so the request line and timestamp split cleanly
    fn strip_delimiters(raw: &str) -> String {
        raw.chars()
            .filter(|c| !matches!(c, '"' | '[' | ']'))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str =
        r#"10.0.0.1 - - [17/May/2015:10:05:03 +0000] "GET /index.html HTTP/1.1" 200 1234"#;

    #[test]
    fn test_parse_field_order() {
        let record = LogParser::parse(LINE);
        assert_eq!(record.remote_host, "10.0.0.1");
        assert_eq!(record.rfc931, "-");
        assert_eq!(record.auth_user, "-");
        assert_eq!(record.datetime, "17/May/2015:10:05:03");
        assert_eq!(record.timezone, "+0000");
        assert_eq!(record.method, "GET");
        assert_eq!(record.pathname, "/index.html");
        assert_eq!(record.protocol, "HTTP/1.1");
        assert_eq!(record.status, "200");
        assert_eq!(record.bytes, "1234");
    }

    #[test]
    fn test_parse_is_total() {
        for raw in ["", "nospaces", "\"[]\"", "[[[", "   ", "─── ╭──╮"] {
            let record = LogParser::parse(raw);
            assert_eq!(record.bytes, "");
        }

        assert_eq!(LogParser::parse(""), LogRecord::default());
        assert_eq!(LogParser::parse("\"[]\"").remote_host, "");
        assert_eq!(LogParser::parse("nospaces").remote_host, "nospaces");
    }

    #[test]
    fn test_parse_single_space_split() {
        // Double spaces yield an empty token and shift later fields
        let record = LogParser::parse("host  ident user");
        assert_eq!(record.remote_host, "host");
        assert_eq!(record.rfc931, "");
        assert_eq!(record.auth_user, "ident");
        assert_eq!(record.datetime, "user");
    }

    #[test]
    fn test_parse_extra_tokens_discarded() {
        let line = format!("{LINE} \"-\" \"Mozilla/5.0 (compatible; Googlebot/2.1)\"");
        let record = LogParser::parse(&line);
        assert_eq!(record.bytes, "1234");
    }

    #[test]
    fn test_parse_idempotent() {
        assert_eq!(LogParser::parse(LINE), LogParser::parse(LINE));
    }
}
