mod common;

use std::collections::HashSet;

use chrono::Utc;
use common::{fixture, property, stay};
use unihome::criteria::{PropertyCriteria, TemporaryStayCriteria};
use unihome::models::{Role, User};
use unihome::services::UpdateTemporaryStayRequest;
use unihome::{Actor, ServiceError, Store, Transaction};

#[tokio::test]
async fn city_filter_is_a_case_insensitive_substring() {
    let f = fixture().await;
    let props = &f.services.properties;
    props
        .create(&f.owner, property("Loft", 500.0, "athens, greece"))
        .await
        .unwrap();
    props
        .create(&f.owner, property("Studio", 300.0, "Patras"))
        .await
        .unwrap();

    let athens = PropertyCriteria {
        city: Some("Athens".to_string()),
        ..Default::default()
    };
    let page = props.search(&athens, 0, 10).await.unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].title, "Loft");
}

#[tokio::test]
async fn price_range_is_inclusive() {
    let f = fixture().await;
    let props = &f.services.properties;
    for price in [100.0, 200.0, 300.0, 400.0, 500.0] {
        props
            .create(&f.owner, property("Flat", price, "Athens"))
            .await
            .unwrap();
    }

    let criteria = PropertyCriteria {
        min_price: Some(200.0),
        max_price: Some(400.0),
        ..Default::default()
    };
    let page = props.search(&criteria, 0, 10).await.unwrap();
    assert_eq!(page.total_items, 3);
    assert!(page.items.iter().all(|p| (200.0..=400.0).contains(&p.price)));

    // an inverted range is ignored rather than rejected
    let inverted = PropertyCriteria {
        min_price: Some(400.0),
        max_price: Some(200.0),
        ..Default::default()
    };
    assert_eq!(props.search(&inverted, 0, 10).await.unwrap().total_items, 5);
}

#[tokio::test]
async fn empty_criteria_returns_the_published_set() {
    let f = fixture().await;
    let props = &f.services.properties;
    let mut ids = Vec::new();
    for title in ["A", "B", "C"] {
        ids.push(props.create(&f.owner, property(title, 250.0, "Volos")).await.unwrap().id);
    }
    props.hide(&f.owner, &ids[1]).await.unwrap();

    let page = props.search(&PropertyCriteria::default(), 0, 10).await.unwrap();
    let found: HashSet<String> = page.items.into_iter().map(|p| p.id).collect();
    let expected: HashSet<String> = [ids[0].clone(), ids[2].clone()].into_iter().collect();
    assert_eq!(found, expected);
}

#[tokio::test]
async fn pages_concatenate_to_the_full_result() {
    let f = fixture().await;
    let props = &f.services.properties;
    let mut all = HashSet::new();
    for n in 0..7 {
        let created = props
            .create(&f.owner, property(&format!("Flat {}", n), 100.0 + n as f64, "Larissa"))
            .await
            .unwrap();
        all.insert(created.id);
    }

    let criteria = PropertyCriteria::default();
    let first = props.search(&criteria, 0, 3).await.unwrap();
    assert_eq!(first.total_items, 7);
    assert_eq!(first.total_pages, 3);

    let mut seen = Vec::new();
    for page in 0..first.total_pages as i64 {
        let result = props.search(&criteria, page, 3).await.unwrap();
        assert_eq!(result.page, page as u64);
        seen.extend(result.items.into_iter().map(|p| p.id));
    }
    assert_eq!(seen.len(), 7);
    let unique: HashSet<String> = seen.into_iter().collect();
    assert_eq!(unique, all);

    let beyond = props.search(&criteria, 5, 3).await.unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total_items, 7);
}

#[tokio::test]
async fn negative_page_and_size_are_clamped() {
    let f = fixture().await;
    let props = &f.services.properties;
    props.create(&f.owner, property("Loft", 500.0, "Athens")).await.unwrap();
    props.create(&f.owner, property("Attic", 450.0, "Athens")).await.unwrap();

    let page = props.search(&PropertyCriteria::default(), -4, 0).await.unwrap();
    assert_eq!(page.page, 0);
    assert_eq!(page.size, 1);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages, 2);
}

#[tokio::test]
async fn recent_listings_are_published_and_newest_first() {
    let f = fixture().await;
    let props = &f.services.properties;
    let mut ids = Vec::new();
    for title in ["A", "B", "C", "D"] {
        ids.push(props.create(&f.owner, property(title, 250.0, "Chania")).await.unwrap().id);
    }
    props.hide(&f.owner, &ids[3]).await.unwrap();

    assert!(props.find_recent(0).await.unwrap().is_empty());
    let recent = props.find_recent(10).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert!(recent.iter().all(|p| p.published));
    assert!(recent
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
    assert_eq!(props.find_recent(2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn hidden_listings_are_visible_to_their_owner_only() {
    let f = fixture().await;
    let props = &f.services.properties;
    let loft = props.create(&f.owner, property("Loft", 500.0, "Athens")).await.unwrap();
    props.hide(&f.owner, &loft.id).await.unwrap();

    assert!(props.get_by_id(&loft.id, None).await.unwrap_err().is_not_found());
    assert!(props
        .get_by_id(&loft.id, Some("regular-1"))
        .await
        .unwrap_err()
        .is_not_found());
    assert!(!props.get_by_id(&loft.id, Some("owner-1")).await.unwrap().published);

    let mine = props.find_mine(&f.owner).await.unwrap();
    assert_eq!(mine.len(), 1);

    props.publish(&f.owner, &loft.id).await.unwrap();
    assert!(props.get_by_id(&loft.id, None).await.unwrap().published);
}

#[tokio::test]
async fn amenity_search_returns_each_stay_once() {
    let f = fixture().await;
    let stays = &f.services.stays;
    let mut request = stay("Room with a view", 35.0, "Heraklion");
    request.amenities = vec!["wifi".to_string(), "parking".to_string(), "wifi ".to_string()];
    let created = stays.create(&f.regular, request).await.unwrap();
    assert_eq!(created.amenities, vec!["wifi", "parking"]);
    stays
        .create(&f.regular, stay("Plain room", 20.0, "Heraklion"))
        .await
        .unwrap();

    let criteria = TemporaryStayCriteria {
        amenities: vec!["wifi".to_string(), "parking".to_string()],
        ..Default::default()
    };
    let page = stays.search(&criteria, 0, 10).await.unwrap();
    assert_eq!(page.total_items, 2);
    let ids: HashSet<&str> = page.items.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids.len(), 2);

    let parking = TemporaryStayCriteria {
        amenities: vec!["parking".to_string()],
        ..Default::default()
    };
    let page = stays.search(&parking, 0, 10).await.unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].id, created.id);
}

#[tokio::test]
async fn stay_management_requires_owner_or_regular_role() {
    let f = fixture().await;
    let stays = &f.services.stays;
    let err = stays
        .create(&f.student, stay("Couch", 10.0, "Athens"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    assert!(stays.create(&f.owner, stay("Couch", 10.0, "Athens")).await.is_ok());

    let mut bad = stay("Couch", 10.0, "Athens");
    bad.min_nights = 0;
    assert!(matches!(
        stays.create(&f.regular, bad).await,
        Err(ServiceError::ValidationFailed(_))
    ));
}

#[tokio::test]
async fn roles_come_from_the_stored_user() {
    let f = fixture().await;
    let claims_owner = Actor::new("student-1", Role::Owner);
    let err = f
        .services
        .properties
        .create(&claims_owner, property("Loft", 500.0, "Athens"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    let err = f
        .services
        .stays
        .create(&claims_owner, stay("Couch", 10.0, "Athens"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    let page = f
        .services
        .properties
        .search(&PropertyCriteria::default(), 0, 10)
        .await
        .unwrap();
    assert_eq!(page.total_items, 0);

    // a stale claim does not lock out a stored owner
    let stale = Actor::new("owner-1", Role::Student);
    assert!(f
        .services
        .properties
        .create(&stale, property("Loft", 500.0, "Athens"))
        .await
        .is_ok());
}

#[tokio::test]
async fn demoted_manager_loses_control_of_their_stays() {
    let f = fixture().await;
    let stays = &f.services.stays;
    let couch = stays
        .create(&f.regular, stay("Couch", 10.0, "Athens"))
        .await
        .unwrap();

    let mut tx = f.store.begin().await.unwrap();
    tx.save(&User {
        id: "regular-1".to_string(),
        email: "regular-1@example.com".to_string(),
        first_name: "Nikos".to_string(),
        last_name: "Test".to_string(),
        role: Role::Student,
        created_at: Utc::now(),
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let patch = UpdateTemporaryStayRequest {
        price_per_night: Some(12.0),
        ..Default::default()
    };
    let forbidden = |r: Result<_, ServiceError>| matches!(r, Err(ServiceError::Forbidden(_)));
    assert!(forbidden(stays.update(&f.regular, &couch.id, patch).await.map(|_| ())));
    assert!(forbidden(stays.hide(&f.regular, &couch.id).await.map(|_| ())));
    assert!(forbidden(stays.publish(&f.regular, &couch.id).await.map(|_| ())));
    assert!(forbidden(stays.delete(&f.regular, &couch.id).await));

    let stored = stays.get_by_id(&couch.id, None).await.unwrap();
    assert_eq!(stored, couch);
}
