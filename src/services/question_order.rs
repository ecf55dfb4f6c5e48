use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use uuid::Uuid;

use crate::db::models::TestQuestion;

/// Seed derived from a session id, so every read of a session shows the same
/// order. Ids that are not uuids hash their bytes instead.
fn session_seed(session_id: &str) -> u64 {
    match Uuid::parse_str(session_id) {
        Ok(uuid) => {
            let (high, low) = uuid.as_u64_pair();
            high ^ low
        }
        Err(_) => session_id
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
                (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
            }),
    }
}

/// Questions in the order a session presents them.
pub(crate) fn for_session(
    questions: Vec<TestQuestion>,
    session_id: &str,
    shuffle: bool,
) -> Vec<TestQuestion> {
    if !shuffle {
        return questions;
    }
    let mut questions = questions;
    let mut rng = StdRng::seed_from_u64(session_seed(session_id));
    questions.shuffle(&mut rng);
    questions
}
