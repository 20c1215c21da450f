//! The question bank: an immutable pool of quiz items sampled per game

use log::info;
use rand::seq::SliceRandom;
use shared::{Question, OPTIONS_PER_QUESTION};
use std::error::Error;
use std::path::Path;

/// Immutable collection of quiz questions loaded at startup.
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Builds a bank from the given items, rejecting malformed ones.
    pub fn new(questions: Vec<Question>) -> Result<Self, Box<dyn Error>> {
        for question in &questions {
            if question.options.len() != OPTIONS_PER_QUESTION {
                return Err(format!(
                    "question '{}' has {} options, expected {}",
                    question.text,
                    question.options.len(),
                    OPTIONS_PER_QUESTION
                )
                .into());
            }
            let valid_token = question
                .answer
                .parse::<usize>()
                .map(|n| (1..=OPTIONS_PER_QUESTION).contains(&n))
                .unwrap_or(false);
            if !valid_token {
                return Err(format!(
                    "question '{}' has invalid answer token '{}'",
                    question.text, question.answer
                )
                .into());
            }
        }
        Ok(Self { questions })
    }

    /// The default general-knowledge set compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            questions: builtin_questions(),
        }
    }

    /// Loads a bank from a JSON file containing an array of questions.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let raw = std::fs::read_to_string(path)?;
        let questions: Vec<Question> = serde_json::from_str(&raw)?;
        let bank = Self::new(questions)?;
        info!("Loaded {} questions from {}", bank.len(), path.display());
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Samples up to `count` distinct questions, uniformly without
    /// replacement. Returns fewer when the bank is smaller than `count`.
    pub fn sample(&self, count: usize) -> Vec<Question> {
        let mut rng = rand::thread_rng();
        self.questions
            .choose_multiple(&mut rng, count.min(self.questions.len()))
            .cloned()
            .collect()
    }
}

fn q(text: &str, options: [&str; OPTIONS_PER_QUESTION], answer: &str) -> Question {
    Question {
        text: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        answer: answer.to_string(),
    }
}

fn builtin_questions() -> Vec<Question> {
    vec![
        q(
            "Which is the longest river in the world?",
            ["Nile", "Amazon", "Yangtze", "Mississippi"],
            "2",
        ),
        q(
            "Which planet is closest to the Sun?",
            ["Venus", "Mars", "Mercury", "Earth"],
            "3",
        ),
        q(
            "Who painted 'The Starry Night'?",
            ["Leonardo da Vinci", "Pablo Picasso", "Vincent van Gogh", "Salvador Dali"],
            "3",
        ),
        q(
            "What is the largest mammal in the world?",
            ["Elephant", "Blue whale", "Giraffe", "Tiger"],
            "2",
        ),
        q(
            "How many sides does a heptagon have?",
            ["5", "6", "7", "8"],
            "3",
        ),
        q(
            "What is the capital of Canada?",
            ["Toronto", "Vancouver", "Montreal", "Ottawa"],
            "4",
        ),
        q(
            "In which year did humans first land on the Moon?",
            ["1969", "1970", "1968", "1971"],
            "1",
        ),
        q(
            "Which is the largest ocean on Earth?",
            ["Atlantic", "Indian", "Pacific", "Arctic"],
            "3",
        ),
        q(
            "Which metal is the most abundant in the Earth's crust?",
            ["Iron", "Aluminium", "Gold", "Copper"],
            "2",
        ),
        q(
            "Which is the only mammal capable of sustained flight?",
            ["Bat", "Flying squirrel", "Pterodactyl", "Penguin"],
            "1",
        ),
        q(
            "Which instrument has strings and is played with a bow?",
            ["Guitar", "Harp", "Violin", "Piano"],
            "3",
        ),
        q(
            "Which is the largest desert in the world?",
            ["Sahara", "Gobi", "Atacama", "Antarctic"],
            "4",
        ),
        q(
            "How many bones are in the adult human body?",
            ["206", "208", "210", "200"],
            "1",
        ),
        q(
            "What is the capital of Australia?",
            ["Sydney", "Melbourne", "Canberra", "Brisbane"],
            "3",
        ),
        q(
            "Who wrote the Odyssey?",
            ["Socrates", "Homer", "Plato", "Aristotle"],
            "2",
        ),
        q(
            "What is the main component of the air we breathe?",
            ["Oxygen", "Carbon dioxide", "Nitrogen", "Argon"],
            "3",
        ),
        q(
            "Which country won the first FIFA World Cup?",
            ["Brazil", "Italy", "Germany", "Uruguay"],
            "4",
        ),
        q(
            "In which year was the Soviet Union dissolved?",
            ["1989", "1991", "1993", "1987"],
            "2",
        ),
        q(
            "Which chemical substance has the formula H2O?",
            ["Sodium chloride", "Methane", "Water", "Ammonia"],
            "3",
        ),
        q(
            "Who is regarded as the father of modern computing?",
            ["Bill Gates", "Alan Turing", "Steve Jobs", "Tim Berners-Lee"],
            "2",
        ),
        q(
            "Which is the largest country by land area?",
            ["Canada", "United States", "China", "Russia"],
            "4",
        ),
        q(
            "What is the currency of Japan?",
            ["Yuan", "Dollar", "Yen", "Euro"],
            "3",
        ),
        q(
            "Who was the first president of the United States?",
            ["Thomas Jefferson", "Abraham Lincoln", "George Washington", "John Adams"],
            "3",
        ),
        q(
            "Which is the fastest land animal?",
            ["Lion", "Gazelle", "Cheetah", "Horse"],
            "3",
        ),
        q(
            "What kind of animal is an orca?",
            ["Fish", "Seal", "Dolphin", "Whale"],
            "3",
        ),
        q(
            "What is the highest point on Earth?",
            ["Mount Everest", "Mount Kilimanjaro", "Denali", "Aconcagua"],
            "1",
        ),
    ]
}
