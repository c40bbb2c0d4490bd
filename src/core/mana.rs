//! Mana system: colors, costs, pools, and atomic payment
//!
//! This is the engine's mana manager. Costs are parsed once from card data
//! (see `mana_parser`) and paid from a player's `ManaPool`. Payment is planned
//! against a copy of the pool first, so a failed payment never mutates state.

use crate::core::mana_parser::{parse_mana_symbols, ManaSymbol};
use crate::error::{ReasonCode, RulesViolation};
use crate::Result;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Mana colors in MTG (Colorless is the sixth "color" of mana, not of cards)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
    Colorless,
}

impl Color {
    pub const ALL: [Color; 6] = [
        Color::White,
        Color::Blue,
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Colorless,
    ];

    pub const COLORED: [Color; 5] = [
        Color::White,
        Color::Blue,
        Color::Black,
        Color::Red,
        Color::Green,
    ];

    pub fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Blue => 1,
            Color::Black => 2,
            Color::Red => 3,
            Color::Green => 4,
            Color::Colorless => 5,
        }
    }

    pub fn from_char(c: char) -> Option<Color> {
        match c.to_ascii_uppercase() {
            'W' => Some(Color::White),
            'U' => Some(Color::Blue),
            'B' => Some(Color::Black),
            'R' => Some(Color::Red),
            'G' => Some(Color::Green),
            'C' => Some(Color::Colorless),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Color::White => 'W',
            Color::Blue => 'U',
            Color::Black => 'B',
            Color::Red => 'R',
            Color::Green => 'G',
            Color::Colorless => 'C',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A hybrid symbol: `{W/U}` or `{2/W}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HybridSymbol {
    TwoColor(Color, Color),
    /// Pay the color or two generic mana
    Monocolored(Color),
}

/// A parsed mana cost
///
/// `colored` is indexed by `Color::index()`; the Colorless slot holds `{C}`
/// requirements (which only colorless mana can pay), not generic mana.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaCost {
    pub generic: u32,
    pub colored: [u32; 6],
    pub hybrid: SmallVec<[HybridSymbol; 2]>,
    pub phyrexian: SmallVec<[Color; 2]>,
    /// Number of `{X}` symbols; must be bound before payment
    pub x_count: u8,
}

impl ManaCost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a mana cost string like "2RR", "{1}{U/B}" or "{X}{R}"
    pub fn parse(s: &str) -> Result<Self> {
        let symbols = parse_mana_symbols(s)?;
        let mut cost = ManaCost::new();
        for symbol in symbols {
            match symbol {
                ManaSymbol::Generic(n) => cost.generic += n,
                ManaSymbol::Colored(color) => cost.colored[color.index()] += 1,
                ManaSymbol::Hybrid(a, b) => cost.hybrid.push(HybridSymbol::TwoColor(a, b)),
                ManaSymbol::MonoHybrid(c) => cost.hybrid.push(HybridSymbol::Monocolored(c)),
                ManaSymbol::Phyrexian(c) => cost.phyrexian.push(c),
                ManaSymbol::X => cost.x_count += 1,
            }
        }
        Ok(cost)
    }

    /// Cost of only generic mana
    pub fn generic(amount: u32) -> Self {
        ManaCost {
            generic: amount,
            ..Self::default()
        }
    }

    pub fn required(&self, color: Color) -> u32 {
        self.colored[color.index()]
    }

    /// Mana value (converted mana cost); X counts as zero
    pub fn cmc(&self) -> u32 {
        let hybrid: u32 = self
            .hybrid
            .iter()
            .map(|h| match h {
                HybridSymbol::TwoColor(..) => 1,
                HybridSymbol::Monocolored(_) => 2,
            })
            .sum();
        self.generic + self.colored.iter().sum::<u32>() + hybrid + self.phyrexian.len() as u32
    }

    /// True when nothing at all must be paid
    pub fn is_zero(&self) -> bool {
        self.cmc() == 0 && self.x_count == 0
    }

    pub fn has_x(&self) -> bool {
        self.x_count > 0
    }

    /// Fold a chosen X value into the generic component. `None` when the
    /// resulting cost does not fit in a `u32`.
    pub fn bind_x(&self, x: u32) -> Option<ManaCost> {
        let extra = x.checked_mul(u32::from(self.x_count))?;
        let mut bound = self.clone();
        bound.generic = bound.generic.checked_add(extra)?;
        bound.x_count = 0;
        Some(bound)
    }

    /// Colors appearing in this cost (card color derivation)
    pub fn colors(&self) -> SmallVec<[Color; 2]> {
        let mut colors: SmallVec<[Color; 2]> = SmallVec::new();
        let mut push = |c: Color| {
            if c != Color::Colorless && !colors.contains(&c) {
                colors.push(c);
            }
        };
        for color in Color::COLORED {
            if self.required(color) > 0 {
                push(color);
            }
        }
        for h in &self.hybrid {
            match *h {
                HybridSymbol::TwoColor(a, b) => {
                    push(a);
                    push(b);
                }
                HybridSymbol::Monocolored(c) => push(c),
            }
        }
        for &c in &self.phyrexian {
            push(c);
        }
        colors.sort();
        colors
    }
}

impl FromStr for ManaCost {
    type Err = crate::MtgError;

    fn from_str(s: &str) -> Result<Self> {
        ManaCost::parse(s)
    }
}

impl fmt::Display for ManaCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.x_count {
            write!(f, "{{X}}")?;
        }
        if self.generic > 0 || self.is_zero() {
            write!(f, "{{{}}}", self.generic)?;
        }
        for h in &self.hybrid {
            match h {
                HybridSymbol::TwoColor(a, b) => write!(f, "{{{a}/{b}}}")?,
                HybridSymbol::Monocolored(c) => write!(f, "{{2/{c}}}")?,
            }
        }
        for color in Color::ALL {
            for _ in 0..self.required(color) {
                write!(f, "{{{color}}}")?;
            }
        }
        for c in &self.phyrexian {
            write!(f, "{{{c}/P}}")?;
        }
        Ok(())
    }
}

/// What a planned payment removes from the pool and from the life total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaPayment {
    pub mana: ManaPool,
    pub life: u32,
}

/// Mana pool for a player: color -> nonnegative count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaPool {
    amounts: [u32; 6],
}

/// One alternative-payment symbol the planner must decide on
#[derive(Clone, Copy)]
enum Alternative {
    Hybrid(HybridSymbol),
    Phyrexian(Color),
}

impl ManaPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, color: Color) -> u32 {
        self.amounts[color.index()]
    }

    pub fn add(&mut self, color: Color, amount: u32) {
        self.amounts[color.index()] += amount;
    }

    pub fn add_color(&mut self, color: Color) {
        self.add(color, 1);
    }

    pub fn add_pool(&mut self, other: &ManaPool) {
        for color in Color::ALL {
            self.add(color, other.get(color));
        }
    }

    pub fn clear(&mut self) {
        self.amounts = [0; 6];
    }

    pub fn total(&self) -> u32 {
        self.amounts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Check if the pool alone can pay the cost (Phyrexian symbols with mana)
    pub fn can_pay(&self, cost: &ManaCost) -> bool {
        self.plan_payment(cost, 0).is_ok()
    }

    /// Plan a payment without mutating the pool
    ///
    /// Colored requirements are taken first, then the alternative symbols
    /// (hybrid and Phyrexian) are searched preferring mana over life, then
    /// generic mana is taken from whatever remains: colorless first, then
    /// whichever color is most plentiful.
    pub fn plan_payment(
        &self,
        cost: &ManaCost,
        life_budget: u32,
    ) -> std::result::Result<ManaPayment, RulesViolation> {
        if cost.x_count > 0 {
            return Err(RulesViolation::IllegalIntent(ReasonCode::UnboundX));
        }

        let mut remaining = self.amounts;
        let mut spent = [0u32; 6];
        for color in Color::ALL {
            let need = cost.required(color);
            let idx = color.index();
            if remaining[idx] < need {
                return Err(RulesViolation::InsufficientResources(
                    ReasonCode::InsufficientMana,
                ));
            }
            remaining[idx] -= need;
            spent[idx] += need;
        }

        let alternatives: SmallVec<[Alternative; 4]> = cost
            .hybrid
            .iter()
            .map(|h| Alternative::Hybrid(*h))
            .chain(cost.phyrexian.iter().map(|c| Alternative::Phyrexian(*c)))
            .collect();

        let mut life_short = false;
        let found = Self::search(
            &alternatives,
            remaining,
            spent,
            cost.generic,
            0,
            life_budget,
            &mut life_short,
        );

        match found {
            Some((spent, life)) => Ok(ManaPayment {
                mana: ManaPool { amounts: spent },
                life,
            }),
            None if life_short => Err(RulesViolation::InsufficientResources(
                ReasonCode::InsufficientLife,
            )),
            None => Err(RulesViolation::InsufficientResources(
                ReasonCode::InsufficientMana,
            )),
        }
    }

    fn search(
        alternatives: &[Alternative],
        remaining: [u32; 6],
        spent: [u32; 6],
        generic: u32,
        life: u32,
        life_budget: u32,
        life_short: &mut bool,
    ) -> Option<([u32; 6], u32)> {
        let Some((first, rest)) = alternatives.split_first() else {
            return Self::pay_generic(remaining, spent, generic).map(|spent| (spent, life));
        };

        let take = |color: Color| -> Option<([u32; 6], [u32; 6])> {
            let idx = color.index();
            if remaining[idx] == 0 {
                return None;
            }
            let (mut r, mut s) = (remaining, spent);
            r[idx] -= 1;
            s[idx] += 1;
            Some((r, s))
        };

        let recurse = |r: [u32; 6], s: [u32; 6], g: u32, l: u32, short: &mut bool| {
            Self::search(rest, r, s, g, l, life_budget, short)
        };

        match *first {
            Alternative::Hybrid(HybridSymbol::TwoColor(a, b)) => {
                // Try the more plentiful color first
                let (first_choice, second_choice) = if remaining[b.index()] > remaining[a.index()] {
                    (b, a)
                } else {
                    (a, b)
                };
                for color in [first_choice, second_choice] {
                    if let Some((r, s)) = take(color) {
                        if let Some(found) = recurse(r, s, generic, life, life_short) {
                            return Some(found);
                        }
                    }
                }
                None
            }
            Alternative::Hybrid(HybridSymbol::Monocolored(c)) => {
                if let Some((r, s)) = take(c) {
                    if let Some(found) = recurse(r, s, generic, life, life_short) {
                        return Some(found);
                    }
                }
                recurse(remaining, spent, generic + 2, life, life_short)
            }
            Alternative::Phyrexian(c) => {
                if let Some((r, s)) = take(c) {
                    if let Some(found) = recurse(r, s, generic, life, life_short) {
                        return Some(found);
                    }
                }
                if life + 2 <= life_budget {
                    recurse(remaining, spent, generic, life + 2, life_short)
                } else {
                    *life_short = true;
                    None
                }
            }
        }
    }

    fn pay_generic(mut remaining: [u32; 6], mut spent: [u32; 6], generic: u32) -> Option<[u32; 6]> {
        if remaining.iter().sum::<u32>() < generic {
            return None;
        }
        let mut left = generic;
        let colorless = Color::Colorless.index();
        let used = left.min(remaining[colorless]);
        remaining[colorless] -= used;
        spent[colorless] += used;
        left -= used;

        while left > 0 {
            let idx = Color::COLORED
                .iter()
                .map(|c| c.index())
                .max_by_key(|&i| (remaining[i], std::cmp::Reverse(i)))?;
            if remaining[idx] == 0 {
                return None;
            }
            remaining[idx] -= 1;
            spent[idx] += 1;
            left -= 1;
        }
        Some(spent)
    }

    /// Remove a previously planned payment's mana
    pub fn apply_payment(&mut self, payment: &ManaPayment) {
        for color in Color::ALL {
            let idx = color.index();
            self.amounts[idx] = self.amounts[idx].saturating_sub(payment.mana.get(color));
        }
    }

    /// Pay a mana cost from this pool atomically
    ///
    /// Returns the payment on success; on failure the pool is unchanged.
    pub fn pay_cost(&mut self, cost: &ManaCost) -> std::result::Result<ManaPayment, RulesViolation> {
        let payment = self.plan_payment(cost, 0)?;
        self.apply_payment(&payment);
        Ok(payment)
    }
}

impl fmt::Display for ManaPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(empty)");
        }
        for color in Color::ALL {
            for _ in 0..self.get(color) {
                write!(f, "{color}")?;
            }
        }
        Ok(())
    }
}
