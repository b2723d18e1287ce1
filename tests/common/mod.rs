#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use unihome::models::{CostCategory, Location, PropertyType, Role, StayType, User};
use unihome::services::{CreatePropertyRequest, CreateTemporaryStayRequest};
use unihome::{Actor, MemoryStore, ServiceDeps, Services, Store, Transaction};

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub services: Services<MemoryStore>,
    pub owner: Actor,
    pub regular: Actor,
    pub student: Actor,
}

pub async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let mut tx = store.begin().await.unwrap();
    for (id, role, first) in [
        ("owner-1", Role::Owner, "Eleni"),
        ("regular-1", Role::Regular, "Nikos"),
        ("student-1", Role::Student, "Maria"),
    ] {
        tx.save(&User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            first_name: first.to_string(),
            last_name: "Test".to_string(),
            role,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    }
    tx.commit().await.unwrap();

    Fixture {
        services: Services::new(ServiceDeps::with_store(Arc::clone(&store))),
        store,
        owner: Actor::new("owner-1", Role::Owner),
        regular: Actor::new("regular-1", Role::Regular),
        student: Actor::new("student-1", Role::Student),
    }
}

pub fn property(title: &str, price: f64, city: &str) -> CreatePropertyRequest {
    CreatePropertyRequest {
        title: title.to_string(),
        description: format!("{} near the university", title),
        kind: PropertyType::Apartment,
        price,
        area: 50.0,
        rooms: 2,
        features: vec!["wifi".to_string(), "balcony".to_string()],
        images: vec![],
        basics: None,
        location: Some(Location {
            city: Some(city.to_string()),
            ..Default::default()
        }),
        contact: None,
        availability: None,
        hospitality: false,
    }
}

pub fn stay(title: &str, price: f64, city: &str) -> CreateTemporaryStayRequest {
    CreateTemporaryStayRequest {
        title: title.to_string(),
        description: "Short stays".to_string(),
        kind: StayType::Room,
        price_per_night: price,
        min_nights: 2,
        cost_category: CostCategory::Paid,
        purpose: None,
        location: Some(Location {
            city: Some(city.to_string()),
            ..Default::default()
        }),
        contact: None,
        availability: None,
        amenities: vec!["wifi".to_string()],
        images: vec![],
    }
}
