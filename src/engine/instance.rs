use std::str::FromStr;

use thiserror::Error;

use crate::engine::pattern::OrderMask;

/// Errors raised while reading the line-based instance format.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing line {0} of instance file")]
    MissingLine(usize),
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid integer `{token}`")]
    InvalidInteger { line: usize, token: String },
    #[error("line {line}: item index {item} out of range (instance has {items} items)")]
    ItemOutOfRange {
        line: usize,
        item: usize,
        items: usize,
    },
    #[error("lower bound {lb} exceeds upper bound {ub}")]
    InvertedBounds { lb: u64, ub: u64 },
}

/// Immutable problem data for one wave-planning run.
///
/// `demand[o][i]` is the number of units of item `i` requested by order `o`,
/// `supply[a][i]` the number of units of item `i` stocked in aisle `a`.
/// The wave must collect a total number of units within `[lb, ub]`.
#[derive(Debug, Clone)]
pub struct Instance {
    demand: Vec<Vec<u64>>,
    supply: Vec<Vec<u64>>,
    lb: u64,
    ub: u64,
    order_units: Vec<u64>,
}

impl Instance {
    /// Build an instance from dense demand/supply matrices.
    ///
    /// Panics if the matrices are not rectangular with a shared item axis;
    /// constructing a malformed instance is a caller bug, not a runtime
    /// condition.
    pub fn new(demand: Vec<Vec<u64>>, supply: Vec<Vec<u64>>, lb: u64, ub: u64) -> Self {
        let items = demand
            .first()
            .map(Vec::len)
            .or_else(|| supply.first().map(Vec::len))
            .unwrap_or(0);
        assert!(
            demand.iter().all(|row| row.len() == items),
            "ragged demand matrix"
        );
        assert!(
            supply.iter().all(|row| row.len() == items),
            "demand/supply item axes differ"
        );
        assert!(lb <= ub, "lower bound exceeds upper bound");

        let order_units = demand.iter().map(|row| row.iter().sum()).collect();

        Instance {
            demand,
            supply,
            lb,
            ub,
            order_units,
        }
    }

    pub fn orders(&self) -> usize {
        self.demand.len()
    }

    pub fn items(&self) -> usize {
        self.demand.first().map_or_else(
            || self.supply.first().map(Vec::len).unwrap_or(0),
            Vec::len,
        )
    }

    pub fn aisles(&self) -> usize {
        self.supply.len()
    }

    pub fn lb(&self) -> u64 {
        self.lb
    }

    pub fn ub(&self) -> u64 {
        self.ub
    }

    #[inline]
    pub fn demand(&self, order: usize, item: usize) -> u64 {
        self.demand[order][item]
    }

    #[inline]
    pub fn supply(&self, aisle: usize, item: usize) -> u64 {
        self.supply[aisle][item]
    }

    /// Total units requested by one order.
    #[inline]
    pub fn order_units(&self, order: usize) -> u64 {
        self.order_units[order]
    }

    /// Total units stocked in one aisle, over all items.
    pub fn aisle_capacity(&self, aisle: usize) -> u64 {
        self.supply[aisle].iter().sum()
    }

    /// Per-item supply summed over a set of aisles.
    pub fn combined_supply(&self, aisles: &[usize]) -> Vec<u64> {
        let mut cap = vec![0u64; self.items()];
        for &a in aisles {
            for (slot, units) in cap.iter_mut().zip(&self.supply[a]) {
                *slot += units;
            }
        }
        cap
    }

    /// Total units over a set of served orders.
    pub fn units_of_mask(&self, orders: &OrderMask) -> u64 {
        orders.ones().map(|o| self.order_units[o]).sum()
    }

    /// True when the served orders fit the combined supply of `aisles`
    /// item by item.
    pub fn mask_fits(&self, orders: &OrderMask, aisles: &[usize]) -> bool {
        let cap = self.combined_supply(aisles);
        for i in 0..self.items() {
            let wanted: u64 = orders.ones().map(|o| self.demand[o][i]).sum();
            if wanted > cap[i] {
                return false;
            }
        }
        true
    }

    /// Validate an (orders, aisles) selection against the wave invariants:
    /// per-item demand within combined supply, and total units within
    /// `[lb, ub]` (an empty selection is valid only when `lb == 0`).
    pub fn selection_feasible<'a, O, A>(&self, orders: O, aisles: A) -> bool
    where
        O: IntoIterator<Item = &'a usize>,
        A: IntoIterator<Item = &'a usize>,
    {
        let aisle_vec: Vec<usize> = aisles.into_iter().copied().collect();
        let cap = self.combined_supply(&aisle_vec);

        let mut used = vec![0u64; self.items()];
        let mut total = 0u64;
        let mut any = false;
        for &o in orders {
            any = true;
            total += self.order_units[o];
            for (slot, units) in used.iter_mut().zip(&self.demand[o]) {
                *slot += units;
            }
        }

        if !any {
            return self.lb == 0;
        }
        if total < self.lb || total > self.ub {
            return false;
        }
        used.iter().zip(&cap).all(|(w, c)| w <= c)
    }
}

fn take_line<'a, I>(lines: &mut I, line_no: &mut usize) -> Result<&'a str, ParseError>
where
    I: Iterator<Item = &'a str>,
{
    *line_no += 1;
    lines.next().ok_or(ParseError::MissingLine(*line_no))
}

fn parse_fields(line: &str, line_no: usize) -> Result<Vec<u64>, ParseError> {
    line.split_whitespace()
        .map(|token| {
            token.parse().map_err(|_| ParseError::InvalidInteger {
                line: line_no,
                token: token.to_string(),
            })
        })
        .collect()
}

fn parse_sparse_row(
    line: &str,
    line_no: usize,
    items: usize,
) -> Result<Vec<u64>, ParseError> {
    let fields = parse_fields(line, line_no)?;
    let declared = *fields.first().ok_or(ParseError::MissingLine(line_no))?;
    let found = fields.len();
    // the declared entry count is unchecked input; compare against the
    // actual field count instead of multiplying it out
    let length_matches = found % 2 == 1 && ((found - 1) / 2) as u64 == declared;
    if !length_matches {
        return Err(ParseError::FieldCount {
            line: line_no,
            expected: usize::try_from(declared.saturating_mul(2).saturating_add(1))
                .unwrap_or(usize::MAX),
            found,
        });
    }

    let mut row = vec![0u64; items];
    for pair in fields[1..].chunks_exact(2) {
        let item = pair[0] as usize;
        if item >= items {
            return Err(ParseError::ItemOutOfRange {
                line: line_no,
                item,
                items,
            });
        }
        row[item] += pair[1];
    }
    Ok(row)
}

impl FromStr for Instance {
    type Err = ParseError;

    /// Parse the challenge text format: a header `O I A`, then `O` sparse
    /// order lines `k i1 q1 ... ik qk`, `A` sparse aisle lines, and a final
    /// `LB UB` line.
    fn from_str(input: &str) -> Result<Self, ParseError> {
        let mut lines = input.lines().filter(|l| !l.trim().is_empty());
        let mut line_no = 0usize;

        let header = parse_fields(take_line(&mut lines, &mut line_no)?, line_no)?;
        if header.len() != 3 {
            return Err(ParseError::FieldCount {
                line: line_no,
                expected: 3,
                found: header.len(),
            });
        }
        let (orders, items, aisles) = (header[0] as usize, header[1] as usize, header[2] as usize);

        let mut demand = Vec::with_capacity(orders);
        for _ in 0..orders {
            demand.push(parse_sparse_row(take_line(&mut lines, &mut line_no)?, line_no, items)?);
        }

        let mut supply = Vec::with_capacity(aisles);
        for _ in 0..aisles {
            supply.push(parse_sparse_row(take_line(&mut lines, &mut line_no)?, line_no, items)?);
        }

        let bounds = parse_fields(take_line(&mut lines, &mut line_no)?, line_no)?;
        if bounds.len() != 2 {
            return Err(ParseError::FieldCount {
                line: line_no,
                expected: 2,
                found: bounds.len(),
            });
        }
        let (lb, ub) = (bounds[0], bounds[1]);
        if lb > ub {
            return Err(ParseError::InvertedBounds { lb, ub });
        }

        Ok(Instance::new(demand, supply, lb, ub))
    }
}
