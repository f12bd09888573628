use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use meal_analyzer::ai::gemini::{
    check_model, rank_candidates, GeminiAnalysisClient, GeminiCatalogClient, GeminiHttpClient,
};
use meal_analyzer::ai::ModelCatalog;
use meal_analyzer::models::Config;
use meal_analyzer::nutrition::{self, ActivityLevel, BodyMetrics, Sex};
use meal_analyzer::summary::NutritionTotals;
use meal_analyzer::{Analyzer, MealInput, ModelChoice, NutritionRecord};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "meal-analyzer")]
#[command(about = "Estimate calories and macros for a meal")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze a meal from a text description or a photo.
    Analyze {
        /// Free-text meal description.
        #[arg(long, conflicts_with = "image", required_unless_present = "image")]
        text: Option<String>,

        /// Path to a meal photo (JPEG, PNG, WebP or GIF).
        #[arg(long)]
        image: Option<PathBuf>,

        /// Print records as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Compute daily calorie and protein targets from body metrics.
    Target {
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        height: f64,
        #[arg(long)]
        age: u32,
        #[arg(long, value_enum)]
        sex: Sex,
        #[arg(long, value_enum, default_value = "moderate")]
        activity: ActivityLevel,
        /// Calories added to maintenance; negative for a deficit.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        goal_offset: i64,
        /// Protein grams per kilogram of body weight.
        #[arg(long, default_value_t = 1.6)]
        protein_ratio: f64,
    },

    /// List models the API key can use, preferred family first.
    Models {
        #[arg(long, default_value = "flash")]
        prefer: String,

        /// Send one short request to the recommended model.
        #[arg(long)]
        check: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meal_analyzer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    if let Err(e) = run(args.command).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Analyze { text, image, json } => {
            let input = match (text, image) {
                (Some(text), None) => MealInput::text(text),
                (None, Some(path)) => MealInput::image_from_path(&path)?,
                _ => bail!("pass exactly one of --text or --image"),
            };

            let config = Config::from_env()?;
            let analyzer = Analyzer::from_config(&config, ModelChoice::shared());
            let records = analyzer.analyze(&input).await?;
            info!("Analysis returned {} records", records.len());

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_records(&records);
            }
        }
        Command::Target {
            weight,
            height,
            age,
            sex,
            activity,
            goal_offset,
            protein_ratio,
        } => {
            let metrics = BodyMetrics {
                weight_kg: weight,
                height_cm: height,
                age,
                sex,
                activity_factor: activity.factor(),
                goal_offset,
                protein_ratio,
            };
            metrics.validate()?;

            let target = nutrition::target(&metrics);
            println!("Calories: {} kcal", target.target_calories);
            println!("Protein:  {} g", target.target_protein_g);
        }
        Command::Models { prefer, check } => {
            let config = Config::from_env()?;
            let mut http = GeminiHttpClient::new(config.gemini_api_key.clone(), config.request_timeout);
            if let Some(base_url) = &config.gemini_base_url {
                http = http.with_base_url(base_url.clone());
            }

            let models = GeminiCatalogClient::from_http(http.clone()).list_models().await?;
            let ranked = rank_candidates(&models, &prefer);
            if ranked.is_empty() {
                bail!("no model available for generateContent with this API key");
            }

            for candidate in &ranked {
                let display_name = models
                    .iter()
                    .find(|m| m.id == candidate.id)
                    .and_then(|m| m.display_name.as_deref())
                    .unwrap_or("");
                println!("{:<40} {}", candidate.id, display_name);
            }

            let recommended = &ranked[0].id;
            info!("Recommended model: {}", recommended);

            if check {
                let generator = GeminiAnalysisClient::from_http(http);
                match check_model(&generator, recommended).await {
                    Ok(reply) => println!("{} answered: {}", recommended, reply),
                    Err(e) => bail!("{} failed the check call: {}", recommended, e),
                }
            }
        }
    }
    Ok(())
}

fn print_records(records: &[NutritionRecord]) {
    println!(
        "{:<30} {:>8} {:>9} {:>7} {:>8}",
        "food", "kcal", "protein", "fat", "carbs"
    );
    for r in records {
        println!(
            "{:<30} {:>8.0} {:>8.1}g {:>6.1}g {:>7.1}g",
            r.food_name(),
            r.calories(),
            r.protein_g(),
            r.fat_g(),
            r.carbs_g()
        );
    }

    let totals = NutritionTotals::from_records(records);
    println!(
        "{:<30} {:>8.0} {:>8.1}g {:>6.1}g {:>7.1}g",
        "total", totals.calories, totals.protein_g, totals.fat_g, totals.carbs_g
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_text_analysis() {
        let args = CliArgs::try_parse_from(["meal-analyzer", "analyze", "--text", "two eggs"]).unwrap();
        match args.command {
            Command::Analyze { text, image, json } => {
                assert_eq!(text.as_deref(), Some("two eggs"));
                assert!(image.is_none());
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_text_and_image_together() {
        let result = CliArgs::try_parse_from([
            "meal-analyzer",
            "analyze",
            "--text",
            "eggs",
            "--image",
            "meal.jpg",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_target_with_negative_offset() {
        let args = CliArgs::try_parse_from([
            "meal-analyzer",
            "target",
            "--weight",
            "70",
            "--height",
            "175",
            "--age",
            "30",
            "--sex",
            "female",
            "--goal-offset",
            "-500",
        ])
        .unwrap();

        match args.command {
            Command::Target {
                sex,
                activity,
                goal_offset,
                protein_ratio,
                ..
            } => {
                assert_eq!(sex, Sex::Female);
                assert_eq!(activity, ActivityLevel::Moderate);
                assert_eq!(goal_offset, -500);
                assert_eq!(protein_ratio, 1.6);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_models_check() {
        let args = CliArgs::try_parse_from(["meal-analyzer", "models", "--check"]).unwrap();
        match args.command {
            Command::Models { prefer, check } => {
                assert_eq!(prefer, "flash");
                assert!(check);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
