//! Parser for the line-oriented database description format.
//!
//! ```text
//! $<kind> <moduleName>   ; kind in {s,f,p}; declares or re-opens a module
//! #0x<hex>               ; service id for the current module
//! *<symbolName> 0x<hex>  ; adds/replaces a symbol in the current module
//! ```
//!
//! Any other line is ignored, so sources can carry free-form commentary.
//! `#` and `*` apply to the most recent `$` line of the same source; a `$`
//! naming an already-registered module re-opens it, which lets one module's
//! symbol list be split across files.

use crate::error::{ParseError, ParseWarning};

use super::{IdentifierDatabase, ModuleKind, ModuleRecord, NAME_LENGTH_MAX, SymbolEntry};

/// Merge `source` into `db` line by line.
///
/// Returns the duplicate-symbol warnings collected on the way. On error the
/// database is left as the failing line found it; callers are responsible
/// for the fail-closed discard.
pub(crate) fn apply_source(
    db: &mut IdentifierDatabase,
    source: &str,
    origin: &str,
) -> Result<Vec<ParseWarning>, ParseError> {
    let mut current: Option<String> = None;
    let mut warnings = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let cx = LineContext {
            origin,
            line: idx + 1,
        };
        // `lines()` strips `\n` and `\r\n`; a stray bare `\r` is still possible.
        let line = raw.trim_end_matches('\r');
        match line.bytes().next() {
            Some(b'$') => current = Some(declare_module(db, line, cx)?),
            Some(b'#') => set_service_id(db, line, cx, current.as_deref())?,
            Some(b'*') => add_symbol(db, line, cx, current.as_deref(), &mut warnings)?,
            _ => {}
        }
    }
    Ok(warnings)
}

#[derive(Clone, Copy)]
struct LineContext<'a> {
    origin: &'a str,
    line: usize,
}

impl LineContext<'_> {
    fn malformed(self, text: &str) -> ParseError {
        ParseError::Malformed {
            origin: self.origin.to_string(),
            line: self.line,
            text: text.to_string(),
        }
    }

    fn check_name(self, name: &str) -> Result<(), ParseError> {
        if name.len() > NAME_LENGTH_MAX {
            return Err(ParseError::NameTooLong {
                origin: self.origin.to_string(),
                line: self.line,
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

/// `$<kind> <name>` — declare a new module or re-open an existing one.
fn declare_module(
    db: &mut IdentifierDatabase,
    line: &str,
    cx: LineContext<'_>,
) -> Result<String, ParseError> {
    let body = &line[1..];
    let mut chars = body.chars();
    let tag = chars.next().ok_or_else(|| cx.malformed(line))?;
    let rest = chars.as_str();
    if !rest.starts_with(char::is_whitespace) {
        return Err(cx.malformed(line));
    }
    let name = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| cx.malformed(line))?;
    cx.check_name(name)?;
    let kind = ModuleKind::from_tag(tag).ok_or(ParseError::UnknownKind {
        origin: cx.origin.to_string(),
        line: cx.line,
        tag,
    })?;

    if let Some(existing) = db.get(name) {
        // Re-opening an existing record extends its symbol table, but only
        // under the kind it was registered with.
        if existing.kind() != kind {
            return Err(ParseError::KindMismatch {
                origin: cx.origin.to_string(),
                line: cx.line,
                name: name.to_string(),
                existing: existing.kind().tag(),
                requested: tag,
            });
        }
    } else {
        db.insert(ModuleRecord::new(name, kind));
    }
    Ok(name.to_string())
}

/// `#0x<hex>` — set the service id of the current module.
fn set_service_id(
    db: &mut IdentifierDatabase,
    line: &str,
    cx: LineContext<'_>,
    current: Option<&str>,
) -> Result<(), ParseError> {
    let module = require_current(cx, current, '#')?;
    let service_id = parse_hex(line[1..].trim_end()).ok_or_else(|| cx.malformed(line))?;
    // Records are only removed by whole-database teardown, so the current
    // module is always still present here.
    if let Some(record) = db.get_mut(module) {
        record.set_service_id(service_id);
    }
    Ok(())
}

/// `*<name> 0x<hex>` — add or replace a symbol in the current module.
fn add_symbol(
    db: &mut IdentifierDatabase,
    line: &str,
    cx: LineContext<'_>,
    current: Option<&str>,
    warnings: &mut Vec<ParseWarning>,
) -> Result<(), ParseError> {
    let module = require_current(cx, current, '*')?;
    let mut fields = line[1..].split_whitespace();
    let name = fields.next().ok_or_else(|| cx.malformed(line))?;
    let nid = fields
        .next()
        .and_then(parse_hex)
        .ok_or_else(|| cx.malformed(line))?;
    cx.check_name(name)?;

    let Some(record) = db.get_mut(module) else {
        return Ok(());
    };
    let replaced = record.insert_symbol(SymbolEntry {
        name: name.to_string(),
        nid,
    });
    if replaced.is_some() {
        let warning = ParseWarning {
            origin: cx.origin.to_string(),
            line: cx.line,
            module: module.to_string(),
            symbol: name.to_string(),
        };
        log::warn!("{warning}");
        warnings.push(warning);
    }
    Ok(())
}

fn require_current<'a>(
    cx: LineContext<'_>,
    current: Option<&'a str>,
    directive: char,
) -> Result<&'a str, ParseError> {
    current.ok_or(ParseError::NoCurrentModule {
        origin: cx.origin.to_string(),
        line: cx.line,
        directive,
    })
}

/// Parse a `0x`-prefixed 32-bit hex field.
fn parse_hex(field: &str) -> Option<u32> {
    let digits = field.strip_prefix("0x")?;
    u32::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ModuleBacking;

    fn populate(db: &mut IdentifierDatabase, source: &str) -> Result<Vec<ParseWarning>, ParseError> {
        db.populate(source, "test.txt")
    }

    #[test]
    fn declares_all_three_kinds() {
        let mut db = IdentifierDatabase::new();
        populate(&mut db, "$s SceNet\n$f path/foo.suprx\n$p SceLibKernel\n").unwrap();
        assert_eq!(db.len(), 3);
        assert_eq!(db.get("SceNet").unwrap().kind(), ModuleKind::SystemService);
        assert_eq!(
            db.get("path/foo.suprx").unwrap().kind(),
            ModuleKind::FileImage
        );
        assert_eq!(
            db.get("SceLibKernel").unwrap().kind(),
            ModuleKind::Preloaded
        );
    }

    #[test]
    fn parses_service_id_and_symbols() {
        let mut db = IdentifierDatabase::new();
        let warnings = populate(
            &mut db,
            "$s SceNet\n#0x00000100\n*sceNetInit 0x12345678\n*sceNetTerm 0xDEADBEEF\n",
        )
        .unwrap();
        assert!(warnings.is_empty());
        let module = db.get("SceNet").unwrap();
        assert_eq!(module.service_id(), Some(0x100));
        assert_eq!(module.symbol("sceNetInit").unwrap().nid, 0x12345678);
        assert_eq!(module.symbol("sceNetTerm").unwrap().nid, 0xDEADBEEF);
    }

    #[test]
    fn service_id_on_file_image_is_accepted_and_ignored() {
        let mut db = IdentifierDatabase::new();
        populate(
            &mut db,
            "$f foo.suprx\n#0x1234ABCD\n*bar 0x0000AAAA\n",
        )
        .unwrap();
        let module = db.get("foo.suprx").unwrap();
        assert_eq!(module.service_id(), None);
        assert_eq!(module.symbol("bar").unwrap().nid, 0x0000AAAA);
    }

    #[test]
    fn unrecognized_lines_are_ignored() {
        let mut db = IdentifierDatabase::new();
        populate(
            &mut db,
            "; NID database for the net stack\n\n$s SceNet\nsome stray note\n*sceNetInit 0x1\n",
        )
        .unwrap();
        assert_eq!(db.get("SceNet").unwrap().symbol_count(), 1);
    }

    #[test]
    fn crlf_sources_parse_cleanly() {
        let mut db = IdentifierDatabase::new();
        populate(&mut db, "$s SceNet\r\n#0x00000100\r\n*sceNetInit 0x1\r\n").unwrap();
        assert_eq!(db.get("SceNet").unwrap().service_id(), Some(0x100));
    }

    #[test]
    fn duplicate_symbol_warns_and_last_write_wins() {
        let mut db = IdentifierDatabase::new();
        let warnings = populate(
            &mut db,
            "$s SceNet\n*sceNetInit 0x1\n*sceNetInit 0x2\n",
        )
        .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].symbol, "sceNetInit");
        assert_eq!(warnings[0].line, 3);
        assert_eq!(db.get("SceNet").unwrap().symbol("sceNetInit").unwrap().nid, 0x2);
    }

    #[test]
    fn second_source_extends_existing_module() {
        let mut db = IdentifierDatabase::new();
        populate(&mut db, "$s SceNet\n*sceNetInit 0x1\n").unwrap();
        populate(&mut db, "$s SceNet\n*sceNetTerm 0x2\n").unwrap();
        let module = db.get("SceNet").unwrap();
        assert_eq!(module.symbol_count(), 2);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn redeclaring_with_different_kind_is_an_error() {
        let mut db = IdentifierDatabase::new();
        populate(&mut db, "$s SceNet\n").unwrap();
        let err = populate(&mut db, "$f SceNet\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::KindMismatch {
                existing: 's',
                requested: 'f',
                ..
            }
        ));
    }

    #[test]
    fn unknown_kind_tag_is_an_error() {
        let mut db = IdentifierDatabase::new();
        let err = populate(&mut db, "$q SceNet\n").unwrap_err();
        assert!(matches!(err, ParseError::UnknownKind { tag: 'q', .. }));
    }

    #[test]
    fn symbol_before_any_module_is_an_error() {
        let mut db = IdentifierDatabase::new();
        let err = populate(&mut db, "*sceNetInit 0x1\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::NoCurrentModule { directive: '*', line: 1, .. }
        ));
    }

    #[test]
    fn service_id_before_any_module_is_an_error() {
        let mut db = IdentifierDatabase::new();
        let err = populate(&mut db, "#0x100\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::NoCurrentModule { directive: '#', .. }
        ));
    }

    #[test]
    fn symbol_line_missing_nid_is_an_error() {
        let mut db = IdentifierDatabase::new();
        let err = populate(&mut db, "$s SceNet\n*badline\n").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { line: 2, .. }));
    }

    #[test]
    fn non_hex_fields_are_errors() {
        let mut db = IdentifierDatabase::new();
        assert!(populate(&mut db, "$s SceNet\n#0xZZZ\n").is_err());
        let mut db = IdentifierDatabase::new();
        assert!(populate(&mut db, "$s SceNet\n*sym 1234\n").is_err());
        let mut db = IdentifierDatabase::new();
        assert!(populate(&mut db, "$s SceNet\n#256\n").is_err());
    }

    #[test]
    fn overlong_names_are_errors() {
        let long = "x".repeat(NAME_LENGTH_MAX + 1);
        let mut db = IdentifierDatabase::new();
        let err = populate(&mut db, &format!("$s {long}\n")).unwrap_err();
        assert!(matches!(err, ParseError::NameTooLong { .. }));

        let mut db = IdentifierDatabase::new();
        let err = populate(&mut db, &format!("$s SceNet\n*{long} 0x1\n")).unwrap_err();
        assert!(matches!(err, ParseError::NameTooLong { .. }));

        // Exactly at the limit is fine.
        let max = "y".repeat(NAME_LENGTH_MAX);
        let mut db = IdentifierDatabase::new();
        populate(&mut db, &format!("$s {max}\n")).unwrap();
    }

    #[test]
    fn module_line_without_name_is_an_error() {
        let mut db = IdentifierDatabase::new();
        assert!(populate(&mut db, "$s\n").is_err());
        let mut db = IdentifierDatabase::new();
        assert!(populate(&mut db, "$s \n").is_err());
        let mut db = IdentifierDatabase::new();
        assert!(populate(&mut db, "$\n").is_err());
    }

    #[test]
    fn structural_error_discards_the_whole_database() {
        let mut db = IdentifierDatabase::new();
        populate(&mut db, "$s SceNet\n*sceNetInit 0x1\n").unwrap();
        assert_eq!(db.len(), 1);
        populate(&mut db, "$s SceSysmem\n*badline\n").unwrap_err();
        assert!(db.is_empty());
    }

    #[test]
    fn file_image_backing_starts_without_runtime_id() {
        let mut db = IdentifierDatabase::new();
        populate(&mut db, "$f foo.suprx\n").unwrap();
        assert_eq!(
            db.get("foo.suprx").unwrap().backing(),
            &ModuleBacking::FileImage { runtime_id: None }
        );
    }
}
