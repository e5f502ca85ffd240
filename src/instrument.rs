use std::fmt;

use crate::error::{AppError, Result};

/// Human-readable names for common base assets, used in alert messages.
pub const TOKEN_NAMES: &[(&str, &str)] = &[
    ("BTC", "Bitcoin"),
    ("ETH", "Ethereum"),
    ("BNB", "Binance Coin"),
    ("SOL", "Solana"),
    ("XRP", "Ripple"),
    ("ADA", "Cardano"),
    ("DOGE", "Dogecoin"),
    ("DOT", "Polkadot"),
    ("AVAX", "Avalanche"),
    ("LINK", "Chainlink"),
    ("MATIC", "Polygon"),
    ("SHIB", "Shiba Inu"),
    ("TRX", "Tron"),
    ("UNI", "Uniswap"),
    ("LTC", "Litecoin"),
    ("USDT", "Tether"),
    ("USDC", "USD Coin"),
];

const PERP_SUFFIX: &str = "_PERP";
const QUOTE_ASSETS: &[&str] = &["USDT", "USDC", "BUSD", "USD"];

/// A monitored trading pair, tagged with the market it trades on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instrument {
    Spot(String),
    Perpetual(String),
}

impl Instrument {
    /// Parse a configured key; a `_PERP` suffix selects the perpetual-futures market.
    pub fn parse(key: &str) -> Result<Self> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(AppError::message("instrument key must not be empty"));
        }

        match trimmed.strip_suffix(PERP_SUFFIX) {
            Some(symbol) if symbol.is_empty() => Err(AppError::message(format!(
                "instrument key `{trimmed}` has no symbol before the {PERP_SUFFIX} suffix"
            ))),
            Some(symbol) => Ok(Instrument::Perpetual(symbol.to_uppercase())),
            None => Ok(Instrument::Spot(trimmed.to_uppercase())),
        }
    }

    /// Exchange symbol sent to the ticker endpoint.
    pub fn symbol(&self) -> &str {
        match self {
            Instrument::Spot(symbol) | Instrument::Perpetual(symbol) => symbol,
        }
    }

    /// Canonical key used for history series and cooldown tracking.
    pub fn key(&self) -> String {
        match self {
            Instrument::Spot(symbol) => symbol.clone(),
            Instrument::Perpetual(symbol) => format!("{symbol}{PERP_SUFFIX}"),
        }
    }

    pub fn is_perpetual(&self) -> bool {
        matches!(self, Instrument::Perpetual(_))
    }

    pub fn market_label(&self) -> &'static str {
        match self {
            Instrument::Spot(_) => "Spot",
            Instrument::Perpetual(_) => "Perpetual",
        }
    }

    /// Display name of the base asset, falling back to the raw symbol.
    pub fn display_name(&self) -> &str {
        let base = self.base_asset();
        TOKEN_NAMES
            .iter()
            .find(|(symbol, _)| *symbol == base)
            .map(|(_, name)| *name)
            .unwrap_or(base)
    }

    fn base_asset(&self) -> &str {
        let symbol = self.symbol();
        for quote in QUOTE_ASSETS {
            if let Some(base) = symbol.strip_suffix(quote) {
                if !base.is_empty() {
                    return base;
                }
            }
        }
        symbol
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instrument::Spot(symbol) => write!(f, "{symbol}"),
            Instrument::Perpetual(symbol) => write!(f, "{symbol}{PERP_SUFFIX}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spot_and_perpetual_keys() {
        assert_eq!(
            Instrument::parse("BTCUSDT").unwrap(),
            Instrument::Spot("BTCUSDT".to_string())
        );
        assert_eq!(
            Instrument::parse("ethusdt_PERP").unwrap(),
            Instrument::Perpetual("ETHUSDT".to_string())
        );
    }

    #[test]
    fn key_round_trips_through_parse() {
        for raw in ["BTCUSDT", "ETHUSDT_PERP"] {
            let instrument = Instrument::parse(raw).unwrap();
            assert_eq!(instrument.key(), raw);
            assert_eq!(Instrument::parse(&instrument.key()).unwrap(), instrument);
        }
    }

    #[test]
    fn rejects_empty_keys() {
        assert!(Instrument::parse("  ").is_err());
        assert!(Instrument::parse("_PERP").is_err());
    }

    #[test]
    fn display_name_resolves_known_base_assets() {
        let btc = Instrument::parse("BTCUSDT").unwrap();
        assert_eq!(btc.display_name(), "Bitcoin");

        let unknown = Instrument::parse("ZZZUSDT").unwrap();
        assert_eq!(unknown.display_name(), "ZZZ");

        let no_quote = Instrument::parse("WEIRDPAIR").unwrap();
        assert_eq!(no_quote.display_name(), "WEIRDPAIR");
    }

    #[test]
    fn perpetual_uses_the_bare_symbol_on_the_wire() {
        let perp = Instrument::parse("BTCUSDT_PERP").unwrap();
        assert_eq!(perp.symbol(), "BTCUSDT");
        assert!(perp.is_perpetual());
        assert_eq!(perp.market_label(), "Perpetual");
    }
}
