pub mod city_routes;
pub mod prediction_routes;
pub mod weather_routes;
