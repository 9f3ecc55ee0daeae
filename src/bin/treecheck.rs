//! Streaming correctness driver.
//!
//! Reads whitespace-separated numeric tokens from stdin, one per record. A
//! non-negative token inserts that key; a negative token erases one entry
//! with key equal to its absolute value (a miss is a failure). After every
//! record — or once at EOF with `-c` — the full invariant audit runs and
//! every entry's rank is recomputed and compared against its in-order
//! position.
//!
//! Exit codes: 0 on clean EOF with all invariants holding, 1 on a parse
//! error, 2 on any check failure. Diagnostics go to stderr.

use clap::Parser;
use std::io::Read;
use std::process::ExitCode;
use sumtree::entry::{PairEntry, SetEntry};
use sumtree::map::MapBase;
use sumtree::order::{KeyOrder, NaturalOrder, OrderBy};
use sumtree::set::SetBase;
use sumtree::store::{BoxStore, CompactStore, NodeStore};
use sumtree::weight::UnitWeight;

#[derive(Parser, Debug)]
#[command(name = "treecheck")]
#[command(about = "Stream insert/erase records from stdin and verify container invariants")]
struct Args {
    /// Verify invariants once at EOF instead of after every record
    #[arg(short = 'c', long)]
    check_at_end: bool,

    /// Use the compact index-arena store instead of per-node allocation
    #[arg(long)]
    compact: bool,

    /// Exercise the multimap flavor (float keys, value = key)
    #[arg(long)]
    map: bool,
}

const EXIT_PARSE: u8 = 1;
const EXIT_CHECK: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse();
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("treecheck: failed to read stdin: {e}");
        return ExitCode::from(EXIT_PARSE);
    }
    match (args.map, args.compact) {
        (false, false) => run_set::<BoxStore<SetEntry<u32>, u32>>(&input, args.check_at_end),
        (false, true) => {
            run_set::<CompactStore<SetEntry<u32>, u32, u32>>(&input, args.check_at_end)
        }
        (true, false) => run_map::<BoxStore<PairEntry<f64, f64>, u32>>(&input, args.check_at_end),
        (true, true) => {
            run_map::<CompactStore<PairEntry<f64, f64>, u32, u32>>(&input, args.check_at_end)
        }
    }
}

/// Full audit: structural check plus a rank sweep over every entry.
fn verify_set<S>(tree: &SetBase<S, UnitWeight<u32>, NaturalOrder, true>) -> Result<(), String>
where
    S: NodeStore<Entry = SetEntry<u32>, Weight = u32>,
{
    tree.check(Some(0.0)).map_err(|e| e.to_string())?;
    let mut c = tree.first_cursor();
    let mut i: u32 = 0;
    while !c.is_end() {
        let r = c.sum_before().map_err(|e| e.to_string())?;
        if r != i {
            return Err(format!("rank {r} at in-order position {i}"));
        }
        c.move_next();
        i += 1;
    }
    if i as usize != tree.len() {
        return Err(format!("walked {i} entries but size is {}", tree.len()));
    }
    Ok(())
}

fn run_set<S>(input: &str, check_at_end: bool) -> ExitCode
where
    S: NodeStore<Entry = SetEntry<u32>, Weight = u32>,
{
    let mut tree: SetBase<S, UnitWeight<u32>, NaturalOrder, true> = SetBase::new();
    for tok in input.split_whitespace() {
        let x: i64 = match tok.parse() {
            Ok(x) => x,
            Err(e) => {
                eprintln!("treecheck: bad token {tok:?}: {e}");
                return ExitCode::from(EXIT_PARSE);
            }
        };
        if x < -(u32::MAX as i64) || x > u32::MAX as i64 {
            eprintln!("treecheck: token {x} outside the key range");
            return ExitCode::from(EXIT_PARSE);
        }
        if x < 0 {
            let k = (-x) as u32;
            match tree.erase_one(&k) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    eprintln!("treecheck: key {k} not found");
                    return ExitCode::from(EXIT_CHECK);
                }
                Err(e) => {
                    eprintln!("treecheck: erase failed: {e}");
                    return ExitCode::from(EXIT_CHECK);
                }
            }
        } else if let Err(e) = tree.insert(x as u32) {
            eprintln!("treecheck: insert failed: {e}");
            return ExitCode::from(EXIT_CHECK);
        }
        if !check_at_end {
            if let Err(msg) = verify_set(&tree) {
                eprintln!("treecheck: {msg}");
                return ExitCode::from(EXIT_CHECK);
            }
        }
    }
    if check_at_end {
        if let Err(msg) = verify_set(&tree) {
            eprintln!("treecheck: {msg}");
            return ExitCode::from(EXIT_CHECK);
        }
    }
    ExitCode::SUCCESS
}

type FloatOrder = OrderBy<fn(&f64, &f64) -> bool>;

fn float_order() -> FloatOrder {
    OrderBy(|a: &f64, b: &f64| a < b)
}

fn verify_map<S, O>(tree: &MapBase<S, UnitWeight<u32>, O, true>) -> Result<(), String>
where
    S: NodeStore<Entry = PairEntry<f64, f64>, Weight = u32>,
    O: KeyOrder<f64>,
{
    tree.check(Some(0.0)).map_err(|e| e.to_string())?;
    let mut c = tree.first_cursor();
    let mut i: u32 = 0;
    while !c.is_end() {
        let r = c.sum_before().map_err(|e| e.to_string())?;
        if r != i {
            return Err(format!("rank {r} at in-order position {i}"));
        }
        c.move_next();
        i += 1;
    }
    if i as usize != tree.len() {
        return Err(format!("walked {i} entries but size is {}", tree.len()));
    }
    Ok(())
}

fn run_map<S>(input: &str, check_at_end: bool) -> ExitCode
where
    S: NodeStore<Entry = PairEntry<f64, f64>, Weight = u32>,
{
    let mut tree: MapBase<S, UnitWeight<u32>, FloatOrder, true> =
        MapBase::with_weight_and_order(UnitWeight::new(), float_order());
    for tok in input.split_whitespace() {
        let x: f64 = match tok.parse() {
            Ok(x) => x,
            Err(e) => {
                eprintln!("treecheck: bad token {tok:?}: {e}");
                return ExitCode::from(EXIT_PARSE);
            }
        };
        if !x.is_finite() {
            eprintln!("treecheck: token {x} is not a finite key");
            return ExitCode::from(EXIT_PARSE);
        }
        if x < 0.0 {
            let k = -x;
            match tree.erase_one(&k) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    eprintln!("treecheck: key {k} not found");
                    return ExitCode::from(EXIT_CHECK);
                }
                Err(e) => {
                    eprintln!("treecheck: erase failed: {e}");
                    return ExitCode::from(EXIT_CHECK);
                }
            }
        } else if let Err(e) = tree.insert(x, x) {
            eprintln!("treecheck: insert failed: {e}");
            return ExitCode::from(EXIT_CHECK);
        }
        if !check_at_end {
            if let Err(msg) = verify_map(&tree) {
                eprintln!("treecheck: {msg}");
                return ExitCode::from(EXIT_CHECK);
            }
        }
    }
    if check_at_end {
        if let Err(msg) = verify_map(&tree) {
            eprintln!("treecheck: {msg}");
            return ExitCode::from(EXIT_CHECK);
        }
    }
    ExitCode::SUCCESS
}
