use colored::Colorize;

use crate::types::{Prediction, Score};

pub fn format_score(score: &Score) -> String {
    format!(
        "{:>5} {:.6e} {:>9.5} {:>10.2} {}",
        score.symbol, score.entropy, score.phase, score.change, score.name
    )
}

pub fn format_prediction(prediction: &Prediction) -> String {
    format!(
        "{:>5} {:>10.4} {:>10.4}",
        prediction.symbol, prediction.original, prediction.refined
    )
}

/// Prints the ranking, highest entropy first, with rising symbols in green and falling in red
pub fn print_ranking(scores: &[Score]) {
    println!("{}", "symbol entropy phase change name".bold());

    for score in scores {
        let line = format_score(score);
        if score.change >= 0. {
            println!("{}", line.green());
        } else {
            println!("{}", line.red());
        }
    }
}

pub fn print_predictions(predictions: &[Prediction]) {
    println!("{}", "symbol close refined".bold());

    for prediction in predictions {
        println!("{}", format_prediction(prediction));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        let score = Score {
            symbol: "K".to_string(),
            name: "KELLANOVA".to_string(),
            entropy: 0.0431914,
            phase: -std::f64::consts::PI,
            change: -1.5,
        };

        assert_eq!(format_score(&score), "    K 4.319140e-2  -3.14159      -1.50 KELLANOVA");
    }

    #[test]
    fn test_format_prediction() {
        let prediction = Prediction {
            symbol: "IBM".to_string(),
            original: 100.,
            refined: 99.75,
        };

        assert_eq!(format_prediction(&prediction), "  IBM   100.0000    99.7500");
    }
}
