//! Price command implementation.
//!
//! Prices a European option on a forward with Black-76, or solves the vol
//! from a quoted premium, and reports the bumped Greeks of a position.

use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::{Duration, Utc};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::warn;

use bean_core::contract::{CallPut, Contract, Position};
use bean_core::types::{Coin, Pair};
use bean_pricing::black76::{forward_option_price, implied_vol};
use bean_pricing::greeks::{MarketInputs, delta, gamma, theta, vega};
use bean_telemetry::spans::pricing_span;

/// Arguments for the price command
#[derive(Args, Debug)]
pub struct PriceArgs {
    /// Days to expiry
    #[arg(long)]
    pub days: i64,

    /// Strike price
    #[arg(long)]
    pub strike: f64,

    /// Forward price of the underlying
    #[arg(long)]
    pub forward: f64,

    /// Volatility, e.g. 0.5 for 50%; ignored when --premium is given
    #[arg(long)]
    pub vol: Option<f64>,

    /// Option side
    #[arg(long, value_enum)]
    pub call_put: OptionSide,

    /// Quoted premium in quote currency; solves for implied vol
    #[arg(long)]
    pub premium: Option<f64>,

    /// Spot price, defaults to the forward
    #[arg(long)]
    pub spot: Option<f64>,

    /// Position size in contracts for the Greeks
    #[arg(long, default_value_t = 1.0)]
    pub quantity: f64,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Option side flag values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OptionSide {
    /// Call
    Call,
    /// Put
    Put,
}

impl From<OptionSide> for CallPut {
    fn from(side: OptionSide) -> Self {
        match side {
            OptionSide::Call => Self::Call,
            OptionSide::Put => Self::Put,
        }
    }
}

/// Pricing output.
#[derive(Debug, Clone, Serialize)]
struct Quote {
    contract: String,
    spot: f64,
    forward: f64,
    vol: f64,
    implied: bool,
    premium: f64,
    delta: f64,
    gamma: f64,
    vega: f64,
    theta: f64,
}

/// Run the price command.
pub fn run(args: &PriceArgs) -> Result<()> {
    let quote = quote(args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&quote)?);
    } else {
        println!("contract  {}", quote.contract);
        println!("spot      {:.4}", quote.spot);
        println!("forward   {:.4}", quote.forward);
        println!("vol       {:.6}{}", quote.vol, if quote.implied { " (implied)" } else { "" });
        println!("premium   {:.6}", quote.premium);
        println!("delta     {:.6}", quote.delta);
        println!("gamma     {:.6}", quote.gamma);
        println!("vega      {:.6}", quote.vega);
        println!("theta     {:.6}", quote.theta);
    }
    Ok(())
}

fn quote(args: &PriceArgs) -> Result<Quote> {
    if args.days < 0 {
        bail!("days must not be negative, got {}", args.days);
    }
    if args.strike <= 0.0 || args.forward <= 0.0 {
        bail!("strike and forward must be positive");
    }
    let spot = args.spot.unwrap_or(args.forward);
    let call_put = CallPut::from(args.call_put);

    let asof = Utc::now();
    let contract = Contract::option(
        Pair::new(Coin::Btc, Coin::Usd),
        asof + Duration::days(args.days),
        args.strike,
        call_put,
    );
    let _span = pricing_span(&contract.name()).entered();

    let (vol, implied) = match (args.premium, args.vol) {
        (Some(premium), _) => {
            let vol = implied_vol(args.days, args.strike, spot, args.forward, premium, call_put);
            if vol.is_nan() {
                warn!(premium, "Implied vol did not converge");
            }
            (vol, true)
        }
        (None, Some(vol)) => (vol, false),
        (None, None) => bail!("either --vol or --premium is required"),
    };

    let premium =
        forward_option_price(args.days, args.strike, args.forward, vol, call_put) * spot / args.forward;
    let position = Position::new(Arc::new(contract), args.quantity, 0.0);
    let market = MarketInputs::new(spot, args.forward, vol);

    Ok(Quote {
        contract: position.contract.name(),
        spot,
        forward: args.forward,
        vol,
        implied,
        premium,
        delta: delta(&position, asof, &market),
        gamma: gamma(&position, asof, &market),
        vega: vega(&position, asof, &market),
        theta: theta(&position, asof, &market),
    })
}
