// SPDX-License-Identifier: GPL-3.0-or-later

#[cfg(test)]
mod tests {
    use crate::{ApiError, SetlistFmClient};
    use setlistify_domain::SetlistFilter;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_KEY: &str = "test-key";

    fn artist_search_response() -> serde_json::Value {
        serde_json::json!({
            "type": "artists",
            "itemsPerPage": 30,
            "page": 1,
            "total": 1,
            "artist": [{
                "mbid": "M1",
                "name": "X",
                "sortName": "X",
                "disambiguation": "",
                "url": "https://www.setlist.fm/setlists/x-M1.html"
            }]
        })
    }

    fn setlist_entry(id: &str, date: &str, venue: &str, tour: Option<&str>) -> serde_json::Value {
        let mut entry = serde_json::json!({
            "id": id,
            "eventDate": date,
            "artist": {"mbid": "M1", "name": "X"},
            "venue": {
                "id": format!("venue-{}", id),
                "name": venue,
                "city": {"name": "C", "country": {"code": "US", "name": "United States"}}
            },
            "url": format!("https://www.setlist.fm/setlist/x/{}.html", id)
        });
        if let Some(tour) = tour {
            entry["tour"] = serde_json::json!({"name": tour});
        }
        entry
    }

    fn setlists_page(entries: Vec<serde_json::Value>, total: u64) -> serde_json::Value {
        serde_json::json!({
            "type": "setlists",
            "itemsPerPage": 2,
            "page": 1,
            "total": total,
            "setlist": entries
        })
    }

    fn setlist_detail_response() -> serde_json::Value {
        let mut detail = setlist_entry("S1", "01-02-2020", "V", Some("Tour"));
        detail["sets"] = serde_json::json!({
            "set": [
                {"song": [
                    {"name": "Opener"},
                    {"name": "Ceremony", "cover": {"mbid": "JD", "name": "Joy Division"}},
                    {"name": "Intro Tape", "tape": true}
                ]},
                {"encore": 1, "song": [
                    {"name": "Encore One", "info": "solo"},
                    {"name": "Closer"}
                ]}
            ]
        });
        detail
    }

    fn client(server: &MockServer) -> SetlistFmClient {
        SetlistFmClient::builder(API_KEY)
            .base_url(server.uri())
            .rate_limit(100, Duration::from_secs(1))
            .backoff_base(Duration::from_millis(10))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_search_artist() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/artists"))
            .and(query_param("artistName", "X"))
            .and(query_param("p", "1"))
            .and(query_param("sort", "relevance"))
            .and(header("x-api-key", API_KEY))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(artist_search_response()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let artists = client(&mock_server).search_artist("X", 1).await.unwrap();

        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].mbid, "M1");
        assert_eq!(artists[0].name, "X");
    }

    #[tokio::test]
    async fn test_end_to_end_artist_setlists_and_songs() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/artists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(artist_search_response()))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/artist/M1/setlists"))
            .and(query_param("p", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(setlists_page(
                vec![
                    setlist_entry("S1", "01-02-2020", "V", None),
                    setlist_entry("S0", "15-01-2020", "W", None),
                ],
                2,
            )))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/setlist/S1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(setlist_detail_response()))
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);

        let artists = client.search_artist("X", 1).await.unwrap();
        assert_eq!(artists[0].mbid, "M1");

        let setlists = client.get_artist_setlists(&artists[0].mbid, 1).await.unwrap();
        let s1 = setlists.iter().find(|s| s.id == "S1").expect("S1 listed");
        assert_eq!(s1.date, "01-02-2020");
        assert_eq!(s1.venue, "V");
        assert_eq!(s1.city, "C");
        assert_eq!(s1.country, "United States");
        assert_eq!(s1.display_title(), "X - V, C (01-02-2020)");

        let songs = client.get_setlist_songs(&s1.id).await.unwrap();
        let order: Vec<_> = songs
            .iter()
            .map(|s| (s.name.as_str(), s.set_number, s.position))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Opener", 1, 1),
                ("Ceremony", 1, 2),
                ("Intro Tape", 1, 3),
                ("Encore One", 2, 1),
                ("Closer", 2, 2),
            ]
        );
        assert_eq!(songs[1].original_artist, "Joy Division");
        assert!(songs[2].tape);
        assert!(songs[3].is_encore());
        assert_eq!(songs[3].info, "solo");
    }

    #[tokio::test]
    async fn test_get_setlist_details_shares_cached_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/setlist/S1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(setlist_detail_response()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let info = client.get_setlist("S1").await.unwrap();
        let songs = client.get_setlist_songs("S1").await.unwrap();

        assert_eq!(info.tour.as_deref(), Some("Tour"));
        assert_eq!(info.venue_id.as_deref(), Some("venue-S1"));
        assert_eq!(songs.len(), 5);
    }

    #[tokio::test]
    async fn test_repeated_search_is_served_from_cache() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/artists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(artist_search_response()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let first = client.search_artist("X", 1).await.unwrap();
        let second = client.search_artist("X", 1).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_setlist_not_found_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/setlist/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).get_setlist_songs("missing").await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_server_error_retried_until_exhausted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/artists"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(3)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).search_artist("X", 1).await;

        assert!(matches!(result, Err(ApiError::Api(ref m)) if m.contains("503")));
    }

    #[tokio::test]
    async fn test_rate_limited_then_recovers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/artists"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search/artists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(artist_search_response()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let artists = client(&mock_server).search_artist("X", 1).await.unwrap();
        assert_eq!(artists[0].name, "X");
    }

    #[tokio::test]
    async fn test_timeout_surfaces_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(artist_search_response())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let client = SetlistFmClient::builder(API_KEY)
            .base_url(mock_server.uri())
            .timeout(Duration::from_millis(50))
            .max_retries(2)
            .backoff_base(Duration::from_millis(10))
            .build()
            .unwrap();

        let result = client.search_artist("X", 1).await;

        assert!(
            matches!(result, Err(ApiError::Api(ref m)) if m == "request timeout after 2 attempts")
        );
    }

    #[tokio::test]
    async fn test_filtered_setlists_across_pages() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/artist/M1/setlists"))
            .and(query_param("p", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(setlists_page(
                vec![
                    setlist_entry("A", "20-06-2019", "Madison Square Garden", Some("World Tour")),
                    setlist_entry("B", "11-06-2019", "Wembley Stadium", Some("World Tour")),
                ],
                0,
            )))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/artist/M1/setlists"))
            .and(query_param("p", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(setlists_page(
                vec![
                    setlist_entry("C", "02-06-2018", "Madison Square Garden", None),
                    setlist_entry("D", "not a date", "madison square garden", Some("Club Tour")),
                ],
                0,
            )))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/artist/M1/setlists"))
            .and(query_param("p", "3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"setlist": []})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let filter = SetlistFilter::default().venue("MADISON").month(6);
        let setlists = client
            .get_artist_setlists_filtered("M1", 5, &filter)
            .await
            .unwrap();

        let ids: Vec<_> = setlists.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["A", "C", "D"]);

        let by_year = client
            .get_artist_setlists_filtered("M1", 5, &SetlistFilter::default().year(2019))
            .await
            .unwrap();
        let ids: Vec<_> = by_year.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "D"]);
    }

    #[tokio::test]
    async fn test_filtered_setlists_respects_page_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/artist/M1/setlists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(setlists_page(
                vec![setlist_entry("A", "20-06-2019", "V", Some("World Tour"))],
                0,
            )))
            .expect(2)
            .mount(&mock_server)
            .await;

        let setlists = client(&mock_server)
            .get_artist_setlists_filtered("M1", 2, &SetlistFilter::default().tour("world"))
            .await
            .unwrap();

        assert_eq!(setlists.len(), 2);
    }

    #[tokio::test]
    async fn test_filtered_setlists_stops_at_advertised_last_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/artist/M1/setlists"))
            .and(query_param("p", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(setlists_page(
                vec![setlist_entry("A", "20-06-2019", "V", None)],
                1,
            )))
            .expect(1)
            .mount(&mock_server)
            .await;

        let setlists = client(&mock_server)
            .get_artist_setlists_filtered("M1", 5, &SetlistFilter::default())
            .await
            .unwrap();

        assert_eq!(setlists.len(), 1);
    }

    #[tokio::test]
    async fn test_filtered_setlists_treats_missing_page_as_end() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/artist/M1/setlists"))
            .and(query_param("p", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(setlists_page(
                vec![setlist_entry("A", "20-06-2019", "V", None)],
                0,
            )))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/artist/M1/setlists"))
            .and(query_param("p", "2"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let setlists = client(&mock_server)
            .get_artist_setlists_filtered("M1", 5, &SetlistFilter::default())
            .await
            .unwrap();

        assert_eq!(setlists.len(), 1);
    }

    #[tokio::test]
    async fn test_recent_setlists_collects_until_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/artists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(artist_search_response()))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/artist/M1/setlists"))
            .and(query_param("p", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(setlists_page(
                vec![
                    setlist_entry("A", "20-06-2019", "V", None),
                    setlist_entry("B", "19-06-2019", "V", None),
                ],
                10,
            )))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/artist/M1/setlists"))
            .and(query_param("p", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(setlists_page(
                vec![
                    setlist_entry("C", "18-06-2019", "V", None),
                    setlist_entry("D", "17-06-2019", "V", None),
                ],
                10,
            )))
            .mount(&mock_server)
            .await;

        let setlists = client(&mock_server)
            .get_recent_setlists("X", 3)
            .await
            .unwrap();

        let ids: Vec<_> = setlists.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_recent_setlists_unknown_artist() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/artists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).get_recent_setlists("Nobody", 5).await;

        assert!(matches!(result, Err(ApiError::NotFound(ref m)) if m.contains("Nobody")));
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        let result = SetlistFmClient::new("   ");
        assert!(matches!(result, Err(ApiError::Authentication(_))));
    }
}
