//! Demo data for trying fitcheck without a backend

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::api::{MemoryStore, Relation, StoreError};
use crate::models::{Actor, Collection, Follow, Like, Piece, Post, Save};
use crate::session::Session;

const WARDROBE: &[(&str, &str)] = &[
    ("Wool coat", "Toteme"),
    ("Straight jeans", "Levi's"),
    ("Loafers", "G.H. Bass"),
    ("Cable knit", "Arket"),
    ("Trench", "Burberry"),
    ("Pleated trousers", "COS"),
    ("Canvas sneakers", "Converse"),
    ("Silk scarf", "Hermès"),
];

const CAPTIONS: &[&str] = &[
    "Monday layers",
    "First cold morning of the year",
    "Thrifted everything",
    "Gallery opening fit",
    "Rain check",
    "Weekend uniform",
];

fn actor(n: u128, handle: &str, display_name: &str, bio: &str) -> Actor {
    Actor {
        id: Uuid::from_u128(n),
        bio: Some(bio.to_string()),
        ..Actor::new(handle, display_name)
    }
}

/// The profiles in the demo store; the first one is the demo session's actor
pub fn demo_actors() -> Vec<Actor> {
    vec![
        actor(1, "mira", "Mira Kovač", "Neutral tones, loud shoes"),
        actor(2, "sol", "Sol Ramírez", "Vintage hunter"),
        actor(3, "ines", "Inês Duarte", "Tailoring enthusiast"),
        actor(4, "tomo", "Tomo Saito", "Workwear, mostly"),
    ]
}

/// Posts from every non-session actor, an hour apart, newest first
pub fn demo_posts() -> Vec<Post> {
    let now = Utc::now();
    let authors = &demo_actors()[1..];

    (0..24u32)
        .map(|i| {
            let author = &authors[i as usize % authors.len()];
            let pieces = (0..2)
                .map(|k| {
                    let (name, brand) = WARDROBE[(i as usize + k * 3) % WARDROBE.len()];
                    Piece::new(name, brand)
                })
                .collect();

            Post {
                id: Uuid::from_u128(100 + u128::from(i)),
                caption: Some(CAPTIONS[i as usize % CAPTIONS.len()].to_string()),
                pieces,
                created_at: now - Duration::hours(i64::from(i)),
                ..Post::new(author.id, format!("demo/outfit-{i:02}.jpg"))
            }
        })
        .collect()
}

/// Session for the first demo actor
pub fn demo_session() -> Session {
    let actors = demo_actors();
    Session::new(actors[0].clone())
}

/// A store seeded with profiles, posts, follows, likes and saves
pub fn demo_store() -> Result<MemoryStore, StoreError> {
    let store = MemoryStore::new();
    let actors = demo_actors();
    let posts = demo_posts();
    let me = actors[0].id;
    let now = Utc::now();

    store.seed(Relation::Users, &actors)?;
    store.seed(Relation::Posts, &posts)?;

    let follows: Vec<Follow> = [actors[1].id, actors[2].id]
        .into_iter()
        .map(|following_id| Follow {
            follower_id: me,
            following_id,
            created_at: now,
        })
        .collect();
    store.seed(Relation::Follows, &follows)?;

    let likes: Vec<Like> = posts
        .iter()
        .step_by(5)
        .map(|p| Like {
            user_id: me,
            post_id: p.id,
            created_at: now,
        })
        .collect();
    store.seed(Relation::Likes, &likes)?;

    let saved = Collection {
        id: Uuid::from_u128(50),
        ..Collection::default_for(me)
    };
    let fall = Collection {
        id: Uuid::from_u128(51),
        ..Collection::new(me, "Fall")
    };
    let saves: Vec<Save> = posts
        .iter()
        .take(6)
        .enumerate()
        .map(|(i, p)| Save {
            user_id: me,
            post_id: p.id,
            collection_id: if i % 2 == 0 { saved.id } else { fall.id },
            created_at: now - Duration::minutes(i as i64),
        })
        .collect();
    store.seed(Relation::Collections, &[saved, fall])?;
    store.seed(Relation::Saves, &saves)?;

    Ok(store)
}
