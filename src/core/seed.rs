//! Demonstration data for the dashboard.

use crate::infrastructure::entities::{
    Chat, ChatStatus, Dataset, Deal, DealStatus, Message, Sender,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Uuid;

pub const CLIENT_COUNT: usize = 50;

const STATUS_WEIGHTS: [(ChatStatus, u32); 4] = [
    (ChatStatus::Consultation, 35),
    (ChatStatus::IndividualConsultation, 25),
    (ChatStatus::NoResponse, 25),
    (ChatStatus::Active, 15),
];

const BOT_LINES: [&str; 6] = [
    "Добро пожаловать! Я помогу вам с вопросами по жилищным программам.",
    "Расскажите, какие у вас планы по приобретению жилья?",
    "Мы предлагаем рассрочку до 15 лет без первоначального взноса.",
    "Хотели бы записаться на бесплатную консультацию?",
    "Предлагаю записаться на индивидуальную консультацию для детального разбора.",
    "Наши специалисты проконсультируют вас по всем вопросам.",
];

const CLIENT_LINES: [&str; 6] = [
    "Здравствуйте!",
    "Интересует покупка квартиры в рассрочку",
    "Какие условия?",
    "Да, хочу записаться на консультацию",
    "Лучше индивидуально пообщаться",
    "Спасибо за информацию",
];

const DEAL_STATUSES: [DealStatus; 3] = [
    DealStatus::ConsultationScheduled,
    DealStatus::IndividualConsultationScheduled,
    DealStatus::NoResponse,
];

/// Generates `CLIENT_COUNT` chats spread over the 60 days before `now`, their
/// transcripts, and a deal for every chat that got past the first contact.
pub fn generate_dataset(rng: &mut impl Rng, now: DateTime<Utc>) -> Dataset {
    let mut dataset = Dataset::default();

    for i in 0..CLIENT_COUNT {
        let client_id = Uuid::new_v4();
        let client_name = format!("Клиент {}", i + 1);
        let client_phone = format!(
            "+375{}{}",
            rng.gen_range(29..=44),
            rng.gen_range(1_000_000..=9_999_999)
        );
        let status = pick_status(rng);

        let started_at = now - Duration::days(rng.gen_range(1..=60));
        let last_message_at = started_at + Duration::hours(rng.gen_range(1..=48));
        let chat_id = Uuid::new_v4();

        let interactions = rng.gen_range(3..=15);
        let mut total_tokens = 0;
        let mut sent_at = started_at;
        for j in 0..interactions {
            if j > 0 {
                sent_at += Duration::minutes(rng.gen_range(5..=30));
            }
            let (sender, lines, tokens) = if j % 2 == 0 {
                (Sender::Bot, &BOT_LINES, rng.gen_range(50..=200))
            } else {
                (Sender::Client, &CLIENT_LINES, rng.gen_range(10..=50))
            };
            total_tokens += tokens;

            dataset.messages.push(Message {
                id: Uuid::new_v4(),
                chat_id,
                sender,
                text: lines.choose(rng).copied().unwrap_or_default().to_owned(),
                created_at: sent_at,
                tokens_used: Some(tokens),
            });
        }

        dataset.chats.push(Chat {
            id: chat_id,
            client_id,
            client_name: client_name.clone(),
            client_phone,
            status,
            started_at,
            last_message_at,
            total_interactions: interactions,
            total_tokens_used: Some(total_tokens),
            dialog_cost: Some(rng.gen_range(5.0..25.0)),
        });

        let deal_status = match status {
            ChatStatus::Consultation => Some(DealStatus::ConsultationScheduled),
            ChatStatus::IndividualConsultation => {
                Some(DealStatus::IndividualConsultationScheduled)
            }
            ChatStatus::Active => DEAL_STATUSES.choose(rng).copied(),
            ChatStatus::NoResponse | ChatStatus::Blocked => None,
        };

        if let Some(deal_status) = deal_status {
            dataset.deals.push(Deal {
                id: Uuid::new_v4(),
                client_id,
                client_name,
                status: deal_status,
                created_at: started_at,
                updated_at: last_message_at,
                estimated_cost: rng.gen_range(80_000.0..300_000.0),
            });
        }
    }

    dataset
}

fn pick_status(rng: &mut impl Rng) -> ChatStatus {
    STATUS_WEIGHTS
        .choose_weighted(rng, |(_, weight)| *weight)
        .map(|(status, _)| *status)
        .unwrap_or(ChatStatus::Active)
}
