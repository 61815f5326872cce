pub const PHRASES: [&str; 6] = [
    "Hello there!",
    "How are you doing?",
    "Testing the application",
    "This is a load test",
    "Checking system performance",
    "Simulating high load",
];

pub fn random_phrase(rng: &mut fastrand::Rng) -> &'static str {
    PHRASES[rng.usize(0..PHRASES.len())]
}
