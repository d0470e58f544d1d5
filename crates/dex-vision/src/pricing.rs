//! Per-model pricing table (§4.3/§6), ported verbatim from
//! `original_source/server/vision/constants.py`'s `OPENAI_PRICING`
//! (October 2025 snapshot). Prices are USD per 1K tokens.

pub struct ModelPrice {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

const DEFAULT_PRICE: ModelPrice = ModelPrice {
    input_per_1k: 0.00250,
    output_per_1k: 0.01000,
};

pub fn price_for(model: &str) -> ModelPrice {
    match model {
        "gpt-5" => ModelPrice { input_per_1k: 0.001250, output_per_1k: 0.01000 },
        "gpt-5-mini" => ModelPrice { input_per_1k: 0.00025, output_per_1k: 0.00200 },
        "gpt-5-nano" => ModelPrice { input_per_1k: 0.00005, output_per_1k: 0.00040 },
        "gpt-5-pro" => ModelPrice { input_per_1k: 0.01500, output_per_1k: 0.12000 },
        "gpt-4.1" => ModelPrice { input_per_1k: 0.00300, output_per_1k: 0.01200 },
        "gpt-4.1-mini" => ModelPrice { input_per_1k: 0.00080, output_per_1k: 0.00320 },
        "gpt-4.1-nano" => ModelPrice { input_per_1k: 0.00020, output_per_1k: 0.00080 },
        "o4-mini" => ModelPrice { input_per_1k: 0.00400, output_per_1k: 0.01600 },
        "gpt-4o" => ModelPrice { input_per_1k: 0.00250, output_per_1k: 0.01000 },
        "gpt-4o-mini" => ModelPrice { input_per_1k: 0.00015, output_per_1k: 0.00060 },
        "gpt-4-turbo" => ModelPrice { input_per_1k: 0.01000, output_per_1k: 0.03000 },
        "gpt-4" => ModelPrice { input_per_1k: 0.03000, output_per_1k: 0.06000 },
        _ => DEFAULT_PRICE,
    }
}

pub fn cost_usd(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let price = price_for(model);
    (input_tokens as f64 / 1000.0) * price.input_per_1k
        + (output_tokens as f64 / 1000.0) * price.output_per_1k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_falls_back_to_default_table_entry() {
        let a = price_for("some-future-model");
        let b = price_for("gpt-4o");
        assert_eq!(a.input_per_1k, b.input_per_1k);
        assert_eq!(a.output_per_1k, b.output_per_1k);
    }

    #[test]
    fn cost_is_linear_in_tokens() {
        let cost = cost_usd("gpt-4o", 2000, 1000);
        assert!((cost - (2.0 * 0.00250 + 1.0 * 0.01000)).abs() < 1e-9);
    }
}
