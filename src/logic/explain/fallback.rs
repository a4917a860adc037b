//! Local explanation templates, used whenever the generator is off or fails

use crate::logic::features::{BICONDYLAR_BREADTH, BIGONIAL_BREADTH, GONIAL_ANGLE, MANDIBULAR_LENGTH};
use crate::logic::inference::Prediction;

/// Qualitative band for a confidence percentage
pub fn confidence_band(confidence: f64) -> &'static str {
    if confidence > 90.0 {
        "Very High"
    } else if confidence > 80.0 {
        "High"
    } else if confidence > 60.0 {
        "Moderate"
    } else {
        "Low"
    }
}

/// Prompt sent to the text generator
pub fn prompt(prediction: &Prediction) -> String {
    let sex = prediction.sex.full_name();
    let m = &prediction.measurements;
    format!(
        "Provide a brief forensic analysis (3-4 sentences max) explaining why the model predicted {sex} \
         with {conf}% confidence.\n\n\
         Key measurements: Mandibular length {len}mm, Bicondylar breadth {bic}mm, \
         Bigonial breadth {big}mm, Gonial angle {ang}°.\n\n\
         Explain in simple terms:\n\
         1. Which 2-3 measurements most indicate {sex}?\n\
         2. Why is the confidence {conf}%?\n\n\
         Keep it concise and professional - maximum 4 sentences total.",
        sex = sex,
        conf = prediction.confidence,
        len = m[MANDIBULAR_LENGTH],
        bic = m[BICONDYLAR_BREADTH],
        big = m[BIGONIAL_BREADTH],
        ang = m[GONIAL_ANGLE],
    )
}

/// Returned when no generator is configured
pub fn unavailable(prediction: &Prediction) -> String {
    format!(
        "AI analysis unavailable (text generation not configured). The model predicted {} \
         based on the mandibular measurements provided, with {}% confidence.",
        prediction.sex.full_name(),
        prediction.confidence
    )
}

/// Returned when the generator errors or times out
pub fn narrative(prediction: &Prediction, model: Option<(&str, f64)>) -> String {
    let sex = prediction.sex.full_name();
    let method = match model {
        Some((name, accuracy)) => format!("{} ({:.0}% held-out accuracy)", name, accuracy * 100.0),
        None => "trained classifier".to_string(),
    };

    format!(
        "**Mandible Analysis**\n\n\
         The model predicted **{sex}** with **{conf}% confidence** based on mandibular morphometric analysis.\n\n\
         **Key Indicators:**\n\
         • Mandibular measurements show patterns consistent with {lower} morphology\n\
         • Analysis based on 15 standardized forensic measurements\n\
         • Confidence level: {band}\n\n\
         **Method:** {method}\n\n\
         *Advanced AI analysis temporarily unavailable.*",
        sex = sex,
        conf = prediction.confidence,
        lower = sex.to_lowercase(),
        band = confidence_band(prediction.confidence),
        method = method,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::SAMPLE_MEASUREMENTS;
    use crate::logic::inference::ClassProbabilities;
    use crate::logic::label::Sex;

    fn prediction(confidence: f64) -> Prediction {
        Prediction {
            sex: Sex::Male,
            confidence,
            probabilities: ClassProbabilities {
                female: 100.0 - confidence,
                male: confidence,
            },
            measurements: SAMPLE_MEASUREMENTS.to_vec(),
        }
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(confidence_band(95.0), "Very High");
        assert_eq!(confidence_band(90.0), "High");
        assert_eq!(confidence_band(80.5), "High");
        assert_eq!(confidence_band(80.0), "Moderate");
        assert_eq!(confidence_band(60.0), "Low");
    }

    #[test]
    fn test_prompt_cites_key_measurements() {
        let text = prompt(&prediction(87.5));
        assert!(text.contains("Male with 87.5% confidence"));
        assert!(text.contains("Mandibular length 10.5mm"));
        assert!(text.contains("Bigonial breadth 9.8mm"));
        assert!(text.contains("Gonial angle 120°"));
    }

    #[test]
    fn test_narrative_names_model() {
        let text = narrative(&prediction(72.0), Some(("Logistic Regression", 0.75)));
        assert!(text.contains("Confidence level: Moderate"));
        assert!(text.contains("Logistic Regression (75% held-out accuracy)"));
        assert!(text.contains("male morphology"));
    }
}
