//! Hand-off to the conversational layer once recommendations are settled.

use shopassist_core::ScoredCandidate;

use crate::llm::ChatMessage;

pub const NO_MATCH_REPLY: &str = "Sorry, no laptop in our catalog matches your \
    requirements within your budget. Could you relax some requirements or raise the budget?";

pub fn below_floor_reply(floor: u64) -> String {
    format!(
        "There are no laptops in that price range. Our catalog starts at {floor}, \
         so please consider a budget of at least that amount."
    )
}

/// Seeds the conversation that walks the user through the accepted set.
pub fn seed_messages(accepted: &[ScoredCandidate]) -> Result<Vec<ChatMessage>, serde_json::Error> {
    let products = serde_json::to_string(accepted)?;
    let system = "You are a laptop expert helping a user choose among the products in the \
        user message. Keep the user's profile in mind when answering questions.\n\
        Begin with a short summary of each laptop, in decreasing order of price, as:\n\
        1. <Laptop name>: <major specifications>, <price>\n\
        2. <Laptop name>: <major specifications>, <price>";
    Ok(vec![
        ChatMessage::system(system),
        ChatMessage::user(format!("These are the user's products: {products}")),
    ])
}

/// Plain-text listing used when no conversational layer is attached.
pub fn render_summary(accepted: &[ScoredCandidate]) -> String {
    if accepted.is_empty() {
        return NO_MATCH_REPLY.to_string();
    }

    let mut ranked: Vec<&ScoredCandidate> = accepted.iter().collect();
    ranked.sort_by(|left, right| right.product.price.cmp(&left.product.price));

    ranked
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let price = candidate
                .product
                .price
                .map(|price| price.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "{}. {}: price {}, score {}/5",
                index + 1,
                candidate.product.name,
                price,
                candidate.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
