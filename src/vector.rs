use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

/// A position or direction with x, y, and z components.
///
/// Layout is a 2D problem, so most helpers operate in the xy plane; z is
/// carried along so callers with 3D input can keep their data and is
/// finalized to zero by the coordinate generator.
///
/// # Example
///
/// ```
/// use moldraw::vector::Vector;
///
/// let v1 = Vector::new(1.0, 2.0, 0.0);
/// let v2 = Vector::new(4.0, 5.0, 0.0);
/// let v3 = v1 + v2;
/// assert_eq!(v3, Vector::new(5.0, 7.0, 0.0));
/// ```
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Add<Vector> for Vector {
    type Output = Vector;

    fn add(self, other: Vector) -> Vector {
        Vector {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, scalar: f64) -> Vector {
        Vector {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl Div<f64> for Vector {
    type Output = Vector;

    fn div(self, scalar: f64) -> Self::Output {
        Vector {
            x: self.x / scalar,
            y: self.y / scalar,
            z: self.z / scalar,
        }
    }
}

impl Sub<Vector> for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Self::Output {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl MulAssign<f64> for Vector {
    fn mul_assign(&mut self, scalar: f64) {
        self.x *= scalar;
        self.y *= scalar;
        self.z *= scalar;
    }
}

impl Default for Vector {
    /// Creates a default `Vector` being the zero vector
    ///
    /// # Examples
    ///
    /// ```
    /// use moldraw::vector::Vector;
    ///
    /// let v = Vector::default();
    /// assert_eq!(v.length(), 0.0)
    /// ```
    fn default() -> Vector {
        Vector::new(0.0, 0.0, 0.0)
    }
}

impl Vector {
    /// Creates a `Vector` from x, y, and z components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates an in-plane `Vector` from x and y components, z is zero.
    pub fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Unit vector in the xy plane pointing along `angle` (radians,
    /// counterclockwise from the positive x axis).
    ///
    /// # Examples
    ///
    /// ```
    /// use moldraw::vector::Vector;
    ///
    /// let east = Vector::from_angle(0.0);
    /// assert!((east.x - 1.0).abs() < 1e-12);
    /// assert!(east.y.abs() < 1e-12);
    /// ```
    pub fn from_angle(angle: f64) -> Self {
        Self::xy(angle.cos(), angle.sin())
    }

    /// In-plane direction angle of the vector in radians.
    ///
    /// # Examples
    ///
    /// ```
    /// use moldraw::vector::Vector;
    ///
    /// let north = Vector::xy(0.0, 2.0);
    /// assert_eq!(north.angle_2d(), std::f64::consts::FRAC_PI_2);
    /// ```
    pub fn angle_2d(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Z component of the cross product of the in-plane parts.
    ///
    /// The sign tells which side of `self` the other vector lies on:
    /// positive means counterclockwise (left), negative clockwise (right).
    ///
    /// ```
    /// use moldraw::vector::Vector;
    ///
    /// let east = Vector::xy(1.0, 0.0);
    /// let north = Vector::xy(0.0, 1.0);
    /// assert!(east.cross_2d(&north) > 0.0);
    /// assert!(north.cross_2d(&east) < 0.0);
    /// ```
    pub fn cross_2d(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Rotates the in-plane part counterclockwise by `angle` radians.
    pub fn rotated_2d(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
            self.z,
        )
    }

    /// Calculates the length of a vector.
    ///
    /// # Examples
    ///
    /// ```
    /// use moldraw::vector::Vector;
    ///
    /// let v = Vector::new(1.0, 1.0, 1.0);
    /// assert_eq!(v.length(), 3.0_f64.sqrt())
    /// ```
    pub fn length(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    /// Calculates the dot product of two vectors.
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Calculates the distance between two vectors
    ///
    /// # Examples
    ///
    /// ```
    /// use moldraw::vector::Vector;
    ///
    /// let v1 = Vector::new(0.0, 0.0, 0.0);
    /// let v2 = Vector::new(3.0, 4.0, 0.0);
    /// assert_eq!(v1.distance(&v2), 5.0);
    /// ```
    pub fn distance(&self, other: &Self) -> f64 {
        (*self - *other).length()
    }

    /// Returns the squared distance between two vectors
    pub fn distance_squared(&self, other: &Self) -> f64 {
        let difference = *other - *self;
        difference.x.powi(2) + difference.y.powi(2) + difference.z.powi(2)
    }

    /// Returns the angle between two vectors in radians.
    ///
    /// # Examples
    ///
    /// ```
    /// use moldraw::vector::Vector;
    ///
    /// let vec_a = Vector::new(1.0, 0.0, 0.0);
    /// let vec_b = Vector::new(0.0, 1.0, 0.0);
    ///
    /// let angle = vec_a.angle_between(&vec_b);
    /// assert_eq!(angle, std::f64::consts::FRAC_PI_2);
    /// ```
    pub fn angle_between(&self, other: &Vector) -> f64 {
        let lengths_product = self.length() * other.length();
        if lengths_product == 0.0 {
            0.0
        } else {
            let angle_cosine = (self.dot(other) / lengths_product).clamp(-1.0, 1.0);
            angle_cosine.acos()
        }
    }

    /// Calculates a unit vector in the same direction.
    ///
    /// # Example
    ///
    /// ```
    /// use moldraw::vector::Vector;
    ///
    /// let vec1 = Vector::new(1.0, 2.0, 3.0);
    /// assert_eq!(vec1.normalize().length().ceil(), 1.0)
    /// ```
    pub fn normalize(&self) -> Self {
        if self.length() == 0.0 {
            *self
        } else {
            *self / self.length()
        }
    }
}

/// Normalizes an angle into the `[0, 2π)` range.
pub fn normalized_angle(angle: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let mut a = angle % tau;
    if a < 0.0 {
        a += tau;
    }
    a
}
