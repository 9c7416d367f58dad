use chrono::NaiveDate;
use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_until, take_while1},
    character::complete::{alpha1, char, digit1, multispace0, multispace1},
    combinator::{map, map_res, opt, recognize},
    multi::separated_list1,
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::filter::{FilterKey, FilterState};
use crate::model::CollectionKind;

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    List {
        collection: CollectionKind,
        filters: Vec<(FilterKey, String)>,
        search: Option<String>,
        /// 1-based, as typed.
        page: Option<usize>,
        size: Option<usize>,
    },
    Get { collection: CollectionKind, code: String },
    Stats { collection: CollectionKind, filters: Vec<(FilterKey, String)> },
    Depreciation { as_of: Option<NaiveDate> },
    Update { collection: CollectionKind, code: String, status: String },
    Delete { collection: CollectionKind, code: String },
    Warehouses,
    Help,
    Exit,
}

/// Folds parsed conditions into a filter state. A later condition on the
/// same key wins.
pub fn filter_state(filters: &[(FilterKey, String)], search: Option<&str>) -> FilterState {
    let mut state = FilterState::new();
    for (key, value) in filters {
        state.set(*key, value.as_str());
    }
    if let Some(term) = search {
        state.set(FilterKey::Search, term);
    }
    state
}

/// Query-string pairs for a list or stats request. The 1-based page typed
/// at the prompt becomes the 0-based page index the API expects.
pub fn query_pairs(state: &FilterState, page: Option<usize>, size: Option<usize>) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = state
        .active()
        .into_iter()
        .map(|(k, v)| (k.as_str().to_string(), v.to_string()))
        .collect();
    if let Some(page) = page {
        pairs.push(("page".to_string(), page.saturating_sub(1).to_string()));
    }
    if let Some(size) = size {
        pairs.push(("page_size".to_string(), size.to_string()));
    }
    pairs
}

// --- BASIC PARSERS ---

fn parse_usize(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

fn parse_date(input: &str) -> IResult<&str, NaiveDate> {
    map_res(
        recognize(tuple((digit1, char('-'), digit1, char('-'), digit1))),
        |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d"),
    )(input)
}

fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let double = delimited(char('"'), take_until("\""), char('"'));
    let single = delimited(char('\''), take_until("'"), char('\''));
    let (input, content) = alt((double, single))(input)?;
    Ok((input, content.to_string()))
}

fn parse_code(input: &str) -> IResult<&str, String> {
    let bare = take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    alt((parse_quoted_string, map(bare, |s: &str| s.to_string())))(input)
}

fn parse_collection(input: &str) -> IResult<&str, CollectionKind> {
    map_res(alpha1, |s: &str| s.parse::<CollectionKind>())(input)
}

fn parse_filter_key(input: &str) -> IResult<&str, FilterKey> {
    map_res(alpha1, |s: &str| s.parse::<FilterKey>())(input)
}

// --- HELPERS ---
fn ws<'a, F, O, E: nom::error::ParseError<&'a str>>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where F: FnMut(&'a str) -> IResult<&'a str, O, E> {
    delimited(multispace0, inner, multispace0)
}

fn tag_ci(t: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| tag_no_case(t)(input)
}

fn parse_condition(input: &str) -> IResult<&str, (FilterKey, String)> {
    let (input, key) = ws(parse_filter_key)(input)?;
    let (input, _) = ws(char('='))(input)?;
    let (input, value) = parse_quoted_string(input)?;
    Ok((input, (key, value)))
}

fn parse_where(input: &str) -> IResult<&str, Vec<(FilterKey, String)>> {
    preceded(ws(tag_ci("WHERE")), separated_list1(ws(tag_ci("AND")), parse_condition))(input)
}

fn parse_code_clause(input: &str) -> IResult<&str, String> {
    let (input, _) = ws(tag_ci("WHERE"))(input)?;
    let (input, _) = ws(tag_ci("CODE"))(input)?;
    let (input, _) = ws(char('='))(input)?;
    parse_code(input)
}

// --- COMMAND PARSERS ---

fn parse_list(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("LIST"), tag_ci("SHOW")))(input)?;
    let (input, _) = multispace1(input)?;
    let (input, collection) = parse_collection(input)?;
    let (input, filters) = opt(parse_where)(input)?;
    let (input, search) = opt(preceded(ws(tag_ci("SEARCH")), parse_quoted_string))(input)?;
    let (input, page) = opt(preceded(ws(tag_ci("PAGE")), parse_usize))(input)?;
    let (input, size) = opt(preceded(ws(tag_ci("SIZE")), parse_usize))(input)?;
    Ok((input, Command::List { collection, filters: filters.unwrap_or_default(), search, page, size }))
}

fn parse_get(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("GET")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, collection) = parse_collection(input)?;
    let (input, _) = multispace1(input)?;
    let (input, code) = parse_code(input)?;
    Ok((input, Command::Get { collection, code }))
}

fn parse_stats(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("STATS")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, collection) = parse_collection(input)?;
    let (input, filters) = opt(parse_where)(input)?;
    Ok((input, Command::Stats { collection, filters: filters.unwrap_or_default() }))
}

fn parse_depreciation(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("DEPRECIATION")(input)?;
    let (input, as_of) = opt(preceded(tuple((ws(tag_ci("AS")), ws(tag_ci("OF")))), parse_date))(input)?;
    Ok((input, Command::Depreciation { as_of }))
}

fn parse_update(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("UPDATE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, collection) = parse_collection(input)?;
    let (input, _) = ws(tag_ci("SET"))(input)?;
    let (input, _) = ws(tag_ci("STATUS"))(input)?;
    let (input, _) = ws(char('='))(input)?;
    let (input, status) = parse_quoted_string(input)?;
    let (input, code) = parse_code_clause(input)?;
    Ok((input, Command::Update { collection, code, status }))
}

fn parse_delete(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("DELETE")(input)?;
    let (input, _) = opt(ws(tag_ci("FROM")))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, collection) = parse_collection(input)?;
    let (input, code) = parse_code_clause(input)?;
    Ok((input, Command::Delete { collection, code }))
}

fn parse_warehouses(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("WAREHOUSES")(input)?;
    Ok((input, Command::Warehouses))
}

fn parse_help(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("HELP")(input)?;
    Ok((input, Command::Help))
}

fn parse_exit(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("EXIT"), tag_ci("QUIT")))(input)?;
    Ok((input, Command::Exit))
}

pub fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    let result = alt((
        parse_list,
        parse_get,
        parse_stats,
        parse_depreciation,
        parse_update,
        parse_delete,
        parse_warehouses,
        parse_help,
        parse_exit,
    ))(input);

    match result {
        Ok((remainder, cmd)) => {
            if !remainder.trim().is_empty() {
                return Err(format!("Unexpected tokens at end: '{}'", remainder));
            }
            Ok(cmd)
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let context: String = if e.input.chars().count() > 20 {
                format!("{}...", e.input.chars().take(20).collect::<String>())
            } else {
                e.input.to_string()
            };
            Err(format!("Invalid syntax near: '{}'", context))
        },
        Err(nom::Err::Incomplete(_)) => Err("Incomplete command.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_with_every_clause() {
        let cmd = parse_command(
            "list assets where status='tersedia' and facility=\"Gedung A\" search \"laptop\" page 2 size 5",
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::List {
                collection: CollectionKind::Assets,
                filters: vec![
                    (FilterKey::Status, "tersedia".to_string()),
                    (FilterKey::Facility, "Gedung A".to_string()),
                ],
                search: Some("laptop".to_string()),
                page: Some(2),
                size: Some(5),
            }
        );
    }

    #[test]
    fn bare_list() {
        let cmd = parse_command("LIST inventory").unwrap();
        assert!(matches!(cmd, Command::List { collection: CollectionKind::Inventory, ref filters, .. } if filters.is_empty()));
    }

    #[test]
    fn get_accepts_quoted_or_bare_code() {
        assert_eq!(
            parse_command("GET returns 'RT-001'").unwrap(),
            Command::Get { collection: CollectionKind::Returns, code: "RT-001".into() }
        );
        assert_eq!(
            parse_command("get purchases PO-2026/07").unwrap(),
            Command::Get { collection: CollectionKind::Purchases, code: "PO-2026/07".into() }
        );
    }

    #[test]
    fn update_and_delete() {
        assert_eq!(
            parse_command("UPDATE assets SET STATUS='rusak' WHERE CODE='AST-003'").unwrap(),
            Command::Update {
                collection: CollectionKind::Assets,
                code: "AST-003".into(),
                status: "rusak".into(),
            }
        );
        assert_eq!(
            parse_command("DELETE FROM inventory WHERE CODE='INV-9'").unwrap(),
            Command::Delete { collection: CollectionKind::Inventory, code: "INV-9".into() }
        );
    }

    #[test]
    fn depreciation_as_of() {
        assert_eq!(
            parse_command("DEPRECIATION AS OF 2026-12-31").unwrap(),
            Command::Depreciation { as_of: NaiveDate::from_ymd_opt(2026, 12, 31) }
        );
        assert_eq!(parse_command("depreciation").unwrap(), Command::Depreciation { as_of: None });
    }

    #[test]
    fn errors_point_at_the_problem() {
        assert!(parse_command("LIST widgets").is_err());
        assert!(parse_command("LIST assets WHERE colour='red'").is_err());
        let err = parse_command("STATS assets extra").unwrap_err();
        assert!(err.contains("extra"));
    }

    #[test]
    fn query_pairs_convert_page_to_index() {
        let state = filter_state(&[(FilterKey::Status, "rusak".into())], Some("pompa"));
        let pairs = query_pairs(&state, Some(3), Some(20));
        assert!(pairs.contains(&("search".to_string(), "pompa".to_string())));
        assert!(pairs.contains(&("status".to_string(), "rusak".to_string())));
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
        assert!(pairs.contains(&("page_size".to_string(), "20".to_string())));
    }
}
