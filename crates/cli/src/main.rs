use std::path::{Path, PathBuf};

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use valuation_core::app::{loading_message, LOADING_MESSAGE_PERIOD};
use valuation_core::dashboard::{
    format_rupee_short, growth_label, growth_percent, roi_series, TrendPhase,
};
use valuation_core::gateway::{split_data_uri, to_data_uri};
use valuation_core::{
    core_config_from_lookup, runtime_settings_from_lookup, spawn_live_feed, AreaUnit,
    ChatSession, Condition, Coordinates, Geocoder, LiveFeed, LiveQuote, MarketScenario,
    MediaEditor, ModelGateway, NominatimClient, PredictionResult, PropertyType,
    RuntimeSettings, TimeFilter, ValuationApp,
};

#[derive(Parser)]
#[command(name = "valuation")]
#[command(about = "Property valuation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full valuation (valuation + grounded insights) for a property
    Predict {
        /// Address or locality
        #[arg(long)]
        location: String,
        /// Latitude of the map pin
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude of the map pin
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Look up the pin from the location when no coordinates are given
        #[arg(long)]
        pin: bool,
        #[arg(long, default_value_t = 1200.0)]
        size: f64,
        /// sqft or acre
        #[arg(long, default_value = "sqft")]
        unit: AreaUnit,
        /// e.g. "Apartment", "Individual House", "Empty Land"
        #[arg(long = "type", default_value = "Apartment")]
        property_type: PropertyType,
        /// Age in years
        #[arg(long, default_value_t = 0)]
        age: u32,
        /// New, Good, Fair or "Needs Renovation"
        #[arg(long, default_value = "New")]
        condition: Condition,
        /// Amenity (repeatable)
        #[arg(long = "amenity")]
        amenities: Vec<String>,
        /// Photo of the property
        #[arg(long)]
        photo: Option<PathBuf>,
        /// Print the result as JSON instead of a report
        #[arg(long)]
        json: bool,
        /// Trend periods to show: all, 3y-window, last-1y or last-3y
        #[arg(long, default_value = "all")]
        filter: TimeFilter,
        /// Follow this many live price refreshes after the report
        #[arg(long, default_value_t = 0)]
        live: usize,
        /// What-if uplift for the live price: comm-hub-shift or infra-corridor
        #[arg(long)]
        scenario: Option<MarketScenario>,
    },
    /// Coordinates for a free-text address
    Geocode {
        query: String,
    },
    /// Short address for a coordinate pair
    ReverseGeocode {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lng: f64,
    },
    /// Chat with the consultant (one message per line, Ctrl-D to quit)
    Chat {
        /// Valuation JSON to ground the conversation in
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// Edit a property photo with an instruction
    EditImage {
        input: PathBuf,
        instruction: String,
        #[arg(long = "type", default_value = "Apartment")]
        property_type: PropertyType,
        /// Where to write the edited image
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Simulate live price updates for a saved valuation
    Live {
        /// Valuation JSON (as printed by `predict --json`)
        result: PathBuf,
        /// Number of refreshes to print before exiting
        #[arg(long, default_value_t = 3)]
        ticks: usize,
        /// Trend periods to show: all, 3y-window, last-1y or last-3y
        #[arg(long, default_value = "all")]
        filter: TimeFilter,
        /// What-if uplift for the live price: comm-hub-shift or infra-corridor
        #[arg(long)]
        scenario: Option<MarketScenario>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("valuation=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict {
            location,
            lat,
            lng,
            pin,
            size,
            unit,
            property_type,
            age,
            condition,
            amenities,
            photo,
            json,
            filter,
            live,
            scenario,
        } => {
            let settings = settings_from_env()?;
            let gateway = gateway_from_env()?;
            let mut app = ValuationApp::new();

            let wizard = app.wizard_mut();
            wizard.set_location(location);
            match lat.zip(lng) {
                Some((lat, lng)) => wizard.set_coordinates(Coordinates::new(lat, lng)),
                None if pin => {
                    if !wizard.pin_location(&NominatimClient::new(&settings)?).await {
                        eprintln!("Could not place a pin for the location; using the default.");
                    }
                }
                None => {}
            }
            wizard.next()?;

            wizard.set_size(size, unit);
            wizard.set_property_type(property_type);
            for amenity in &amenities {
                wizard.toggle_amenity(amenity);
            }
            if let Some(path) = photo {
                wizard.set_photo(Some(read_image_data_uri(&path)?));
            }
            wizard.next()?;

            wizard.set_age(age);
            wizard.set_condition(condition);

            let result = submit_with_progress(&mut app, &gateway).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render_report(&result, settings.present_year(), filter));
            }

            if live > 0 {
                if let Some(scenario) = scenario {
                    app.toggle_scenario(scenario);
                }
                if let Some(feed) = app.live_feed(settings.live_feed_config()) {
                    let delta = app.scenario_delta();
                    follow_live(feed, live, delta, filter, settings.present_year()).await?;
                }
            }
        }
        Commands::Geocode { query } => match geocoder_from_env()?.forward(&query).await? {
            Some(coords) => println!("{}, {}", coords.latitude, coords.longitude),
            None => println!("No match found."),
        },
        Commands::ReverseGeocode { lat, lng } => {
            match geocoder_from_env()?
                .reverse(Coordinates::new(lat, lng))
                .await?
            {
                Some(address) => println!("{address}"),
                None => println!("No address found."),
            }
        }
        Commands::Chat { context } => {
            let gateway = gateway_from_env()?;
            let context = context.as_deref().map(read_prediction).transpose()?;
            let mut session = ChatSession::new();
            println!("PS: {}", session.messages()[0].text);

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(reply) = session.send(&gateway, &line, context.as_ref()).await {
                    println!("PS: {}", reply.text);
                }
            }
        }
        Commands::EditImage {
            input,
            instruction,
            property_type,
            output,
        } => {
            let gateway = gateway_from_env()?;
            let mut editor = MediaEditor::new(read_image_data_uri(&input)?, property_type);
            let edited = editor.apply_edit(&gateway, &instruction).await?;
            let bytes = decode_data_uri(edited)?;
            std::fs::write(&output, bytes)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Edited image written to {}", output.display());
        }
        Commands::Live {
            result,
            ticks,
            filter,
            scenario,
        } => {
            let settings = settings_from_env()?;
            let result = read_prediction(&result)?;
            let delta = scenario.map_or(0.0, |s| s.delta(result.predicted_price));

            let feed = spawn_live_feed(&result, settings.live_feed_config());
            follow_live(feed, ticks, delta, filter, settings.present_year()).await?;
        }
    }

    Ok(())
}

fn settings_from_env() -> anyhow::Result<RuntimeSettings> {
    Ok(runtime_settings_from_lookup(|name| std::env::var(name).ok())?)
}

fn gateway_from_env() -> anyhow::Result<ModelGateway> {
    let cfg = core_config_from_lookup(|name| std::env::var(name).ok())?;
    Ok(ModelGateway::from_config(&cfg)?)
}

fn geocoder_from_env() -> anyhow::Result<NominatimClient> {
    let settings = settings_from_env()?;
    tracing::debug!(base = settings.geocoder_base(), "using geocoder");
    Ok(NominatimClient::new(&settings)?)
}

/// Submit the wizard, cycling the loading messages on stderr until it finishes.
async fn submit_with_progress(
    app: &mut ValuationApp,
    gateway: &ModelGateway,
) -> anyhow::Result<PredictionResult> {
    let submission = app.submit(gateway);
    tokio::pin!(submission);
    let mut progress = tokio::time::interval(LOADING_MESSAGE_PERIOD);
    let mut step = 0;

    loop {
        tokio::select! {
            outcome = &mut submission => return Ok(outcome?.clone()),
            _ = progress.tick() => {
                eprintln!("{}", loading_message(step));
                step += 1;
            }
        }
    }
}

/// Print `ticks` refreshed quotes from `feed`, then stop it.
async fn follow_live(
    feed: LiveFeed,
    ticks: usize,
    scenario_delta: f64,
    filter: TimeFilter,
    present_year: i32,
) -> anyhow::Result<()> {
    let mut updates = feed.subscribe();
    print!("{}", render_live_quote(&feed.latest(), scenario_delta, filter, present_year));

    let mut printed = 0;
    while printed < ticks {
        updates.changed().await?;
        let quote = updates.borrow_and_update().clone();
        if quote.updating {
            continue;
        }
        print!("{}", render_live_quote(&quote, scenario_delta, filter, present_year));
        printed += 1;
    }
    feed.stop();
    Ok(())
}

fn render_live_quote(
    quote: &LiveQuote,
    scenario_delta: f64,
    filter: TimeFilter,
    present_year: i32,
) -> String {
    let mut out = format!(
        "[{}] Live price: {}",
        quote.last_updated.format("%H:%M:%S"),
        format_rupee_short(quote.predicted_price + scenario_delta)
    );
    if scenario_delta != 0.0 {
        out.push_str(&format!(" (+{} scenario)", format_rupee_short(scenario_delta)));
    }
    out.push('\n');

    let shown: Vec<_> = filter
        .apply(&quote.market_trends, present_year)
        .into_iter()
        .cloned()
        .collect();
    let roi: Vec<String> = roi_series(&shown)
        .into_iter()
        .map(|point| format!("{} {}", point.period, growth_label(point.percent)))
        .collect();
    if !roi.is_empty() {
        out.push_str(&format!("  ROI ({}): {}\n", filter.label(), roi.join(", ")));
    }
    out
}

/// Read an image file and wrap it as a data URI, sniffing the mime type from its bytes.
fn read_image_data_uri(path: &Path) -> anyhow::Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let kind = infer::get(&bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .with_context(|| format!("{} is not a recognised image", path.display()))?;
    Ok(to_data_uri(kind.mime_type(), &BASE64.encode(&bytes)))
}

fn decode_data_uri(uri: &str) -> anyhow::Result<Vec<u8>> {
    let (_, data) = split_data_uri(uri);
    BASE64
        .decode(data.as_bytes())
        .context("edited image is not valid base64")
}

fn read_prediction(path: &Path) -> anyhow::Result<PredictionResult> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let result: PredictionResult = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valuation result", path.display()))?;
    result.validate()?;
    Ok(result)
}

fn render_report(result: &PredictionResult, present_year: i32, filter: TimeFilter) -> String {
    let (low, high) = result.price_range;
    let mut out = format!(
        "Valuation: {} ({} - {}), confidence {:.0}%\n",
        format_rupee_short(result.predicted_price),
        format_rupee_short(low),
        format_rupee_short(high),
        result.confidence_score * 100.0
    );

    out.push_str(&format!("\nMarket trajectory ({}):\n", filter.label()));
    let trends = filter.apply(&result.market_trends, present_year);
    let mut previous: Option<f64> = None;
    for point in trends {
        let growth = previous
            .and_then(|p| growth_percent(p, point.price))
            .map(|g| format!(" {}", growth_label(g)))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {:<8} {:<10} [{} - {}] {}{}\n",
            point.period,
            format_rupee_short(point.price),
            format_rupee_short(point.low),
            format_rupee_short(point.high),
            TrendPhase::classify(&point.period, present_year).label(),
            growth
        ));
        previous = Some(point.price);
    }

    if !result.influencing_factors.is_empty() {
        out.push_str("\nInfluencing factors:\n");
        for factor in &result.influencing_factors {
            out.push_str(&format!(
                "  [{:?}] {}: {}\n",
                factor.impact, factor.factor, factor.description
            ));
        }
    }

    out.push_str(&format!("\nNearby: {}\n", result.nearby_insights));
    let advice = &result.buyer_seller_advice;
    out.push_str(&format!(
        "Buyers: {}\nSellers: {}\nWhy: {}\n",
        advice.buyer_action, advice.seller_action, advice.reasoning
    ));

    if !result.grounding_links.is_empty() {
        out.push_str("\nSources:\n");
        for link in &result.grounding_links {
            out.push_str(&format!("  {} <{}>\n", link.title, link.uri));
        }
    }
    out
}
